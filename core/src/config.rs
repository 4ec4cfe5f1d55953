//! Hub connection configuration

use crate::error::ConfigError;
use crate::hub::{self, HUB_PORT};
use crate::sas::{SasToken, DEFAULT_TOKEN_TTL_SECS};

/// Default telemetry publish interval
pub const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 2000;

/// Default time before expiry at which the SAS token is replaced
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 300;

/// IoT Hub connection settings
///
/// All strings are `'static`: the firmware bakes them in at build time.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Hub host name, e.g. `my-hub.azure-devices.net`
    pub host: &'static str,
    /// Registered device id
    pub device_id: &'static str,
    /// Base64 symmetric device key
    pub device_key: &'static str,
    /// MQTT over TLS port
    pub port: u16,
    /// Value advertised as `DeviceClientType` (URL-encoded); empty to omit
    pub user_agent: &'static str,
    /// Interval between telemetry publishes
    pub telemetry_interval_ms: u64,
    /// SAS token lifetime
    pub token_ttl_secs: u64,
    /// Refresh the token this long before it expires
    pub refresh_margin_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "",
            device_id: "",
            device_key: "",
            port: HUB_PORT,
            user_agent: "hub-bridge%2F0.1.0",
            telemetry_interval_ms: DEFAULT_TELEMETRY_INTERVAL_MS,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
        }
    }
}

impl HubConfig {
    /// Check the settings before the first connection attempt
    ///
    /// Signs a throwaway token so a bad device key is reported at boot rather
    /// than on every reconnect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        hub::validate_device_id(self.device_id)?;
        SasToken::generate(self.host, self.device_id, self.device_key, 0)?;
        if self.telemetry_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.refresh_margin_secs >= self.token_ttl_secs {
            return Err(ConfigError::RefreshMarginTooLarge);
        }
        Ok(())
    }

    /// Expiry for a token signed at `now` (Unix seconds)
    pub fn token_expiry(&self, now: u64) -> u64 {
        now.saturating_add(self.token_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> HubConfig {
        HubConfig {
            host: "example-hub.azure-devices.net",
            device_id: "sensor-node-01",
            device_key: "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=",
            ..HubConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.port, 8883);
        assert_eq!(config.telemetry_interval_ms, 2000);
        assert_eq!(config.token_ttl_secs, 3600);
        assert_eq!(config.refresh_margin_secs, 300);
    }

    #[test]
    fn test_validate() {
        assert_eq!(valid().validate(), Ok(()));
        assert_eq!(
            HubConfig::default().validate(),
            Err(ConfigError::MissingHost)
        );
        assert_eq!(
            HubConfig {
                device_id: "a/b",
                ..valid()
            }
            .validate(),
            Err(ConfigError::InvalidDeviceId)
        );
        assert_eq!(
            HubConfig {
                device_key: "%%%",
                ..valid()
            }
            .validate(),
            Err(ConfigError::InvalidDeviceKey)
        );
        assert_eq!(
            HubConfig {
                telemetry_interval_ms: 0,
                ..valid()
            }
            .validate(),
            Err(ConfigError::ZeroInterval)
        );
        assert_eq!(
            HubConfig {
                refresh_margin_secs: 3600,
                ..valid()
            }
            .validate(),
            Err(ConfigError::RefreshMarginTooLarge)
        );
    }

    #[test]
    fn test_token_expiry() {
        assert_eq!(valid().token_expiry(1_000), 4_600);
    }
}
