#![deny(unsafe_code)]
#![deny(warnings)]
//! Network configuration structures
//!
//! Hub credentials are baked in at build time:
//!
//! ```text
//! HUB_HOST=my-hub.azure-devices.net HUB_DEVICE_ID=node-01 \
//! HUB_DEVICE_KEY=<base64 key> cargo run --release
//! ```
//!
//! Unset variables leave the fields empty, which `HubConfig::validate`
//! reports at boot.

use hub_bridge_core::HubConfig;

const fn env_or_empty(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "",
    }
}

const HUB_HOST: &str = env_or_empty(option_env!("HUB_HOST"));
const HUB_DEVICE_ID: &str = env_or_empty(option_env!("HUB_DEVICE_ID"));
const HUB_DEVICE_KEY: &str = env_or_empty(option_env!("HUB_DEVICE_KEY"));

/// IoT Hub settings for this build
pub fn hub_config() -> HubConfig {
    HubConfig {
        host: HUB_HOST,
        device_id: HUB_DEVICE_ID,
        device_key: HUB_DEVICE_KEY,
        ..HubConfig::default()
    }
}

/// SNTP client configuration
#[derive(Debug, Clone)]
pub struct SntpConfig {
    /// NTP servers to try (in order)
    pub servers: &'static [&'static str],
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of retry attempts per server
    pub retry_count: usize,
    /// Maximum accepted stratum level (1-15)
    pub max_stratum: u8,
}

impl Default for SntpConfig {
    fn default() -> Self {
        Self {
            servers: &["pool.ntp.org", "time.nist.gov"],
            timeout_ms: 5000,
            retry_count: 3,
            max_stratum: 3,
        }
    }
}

/// Network stack configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for the W5500
    pub mac_addr: [u8; 6],
    /// Random seed for the embassy-net stack
    pub seed: u64,
    /// Delay before rerunning the connection chain after a failure
    pub reconnect_backoff_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_addr: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
            seed: 0x1234_5678_u64,
            reconnect_backoff_secs: 5,
        }
    }
}
