//! Shared access signature (SAS) tokens for IoT Hub device authentication
//!
//! The token is the MQTT password. It signs the device resource URI and an
//! expiry time with the device's symmetric key:
//!
//! ```text
//! sr  = url(host) "%2Fdevices%2F" url(device_id)
//! sig = url(base64(hmac_sha256(base64_decode(key), sr "\n" expiry)))
//! SharedAccessSignature sr={sr}&sig={sig}&se={expiry}
//! ```

use core::fmt::Write;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use heapless::String;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

use crate::error::SasError;

/// Default token lifetime (1 hour)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Password capacity
pub const MAX_TOKEN_LEN: usize = 512;

/// Largest decoded device key (IoT Hub keys are 32 or 64 bytes)
const MAX_KEY_LEN: usize = 64;

/// Resource URI capacity
const MAX_RESOURCE_LEN: usize = 384;

/// Everything except RFC 3986 unreserved characters is escaped
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

/// A signed, time-bounded MQTT password
#[derive(Clone, PartialEq, Eq)]
pub struct SasToken {
    password: String<MAX_TOKEN_LEN>,
    expires_at: u64,
}

impl SasToken {
    /// Sign a token for `device_id` that expires at `expires_at` (Unix seconds)
    ///
    /// # Errors
    ///
    /// - `SasError::InvalidKey` if `device_key` is empty or not base64
    /// - `SasError::BufferFull` if the token exceeds `MAX_TOKEN_LEN`
    pub fn generate(
        host: &str,
        device_id: &str,
        device_key: &str,
        expires_at: u64,
    ) -> Result<Self, SasError> {
        let mut key = [0u8; MAX_KEY_LEN];
        let key_len = STANDARD
            .decode_slice(device_key.as_bytes(), &mut key)
            .map_err(|_| SasError::InvalidKey)?;
        if key_len == 0 {
            return Err(SasError::InvalidKey);
        }

        let mut resource = String::<MAX_RESOURCE_LEN>::new();
        write!(
            resource,
            "{}%2Fdevices%2F{}",
            utf8_percent_encode(host, URL_ENCODE_SET),
            utf8_percent_encode(device_id, URL_ENCODE_SET)
        )
        .map_err(|_| SasError::BufferFull)?;

        let mut expiry = String::<20>::new();
        write!(expiry, "{}", expires_at).map_err(|_| SasError::BufferFull)?;

        let mut mac =
            HmacSha256::new_from_slice(&key[..key_len]).map_err(|_| SasError::InvalidKey)?;
        mac.update(resource.as_bytes());
        mac.update(b"\n");
        mac.update(expiry.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut sig_buf = [0u8; 64];
        let sig_len = STANDARD
            .encode_slice(digest, &mut sig_buf)
            .map_err(|_| SasError::BufferFull)?;
        let signature =
            core::str::from_utf8(&sig_buf[..sig_len]).map_err(|_| SasError::BufferFull)?;

        let mut password = String::new();
        write!(
            password,
            "SharedAccessSignature sr={}&sig={}&se={}",
            resource,
            utf8_percent_encode(signature, URL_ENCODE_SET),
            expiry
        )
        .map_err(|_| SasError::BufferFull)?;

        Ok(Self {
            password,
            expires_at,
        })
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Expiry in Unix seconds
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

impl core::fmt::Debug for SasToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SasToken")
            .field("password", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "example-hub.azure-devices.net";
    const DEVICE: &str = "sensor-node-01";
    // base64 of bytes 0x00..=0x1f
    const KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

    #[test]
    fn test_known_token() {
        let token = SasToken::generate(HOST, DEVICE, KEY, 1_700_003_600).unwrap();
        assert_eq!(
            token.password(),
            "SharedAccessSignature sr=example-hub.azure-devices.net%2Fdevices%2Fsensor-node-01\
             &sig=dYPTDcUMH0A0WoB0ZwqOcpvl0CdfzptEgNFfqThW0Ew%3D&se=1700003600"
        );
        assert_eq!(token.expires_at(), 1_700_003_600);
    }

    #[test]
    fn test_expiry_changes_signature() {
        let a = SasToken::generate(HOST, DEVICE, KEY, 1_700_003_600).unwrap();
        let b = SasToken::generate(HOST, DEVICE, KEY, 1_700_007_200).unwrap();
        assert_ne!(a.password(), b.password());
    }

    #[test]
    fn test_invalid_keys() {
        assert_eq!(
            SasToken::generate(HOST, DEVICE, "", 0),
            Err(SasError::InvalidKey)
        );
        assert_eq!(
            SasToken::generate(HOST, DEVICE, "not base64!", 0),
            Err(SasError::InvalidKey)
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let token = SasToken::generate(HOST, DEVICE, KEY, 1).unwrap();
        let shown = format!("{:?}", token);
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains("SharedAccessSignature"));
    }
}
