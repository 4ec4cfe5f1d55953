#![deny(warnings)]
//! Network side of the bridge
//!
//! - **`config`**: hub settings from the build environment, SNTP and stack defaults
//! - **`error`**: `NetworkError` and its TLS/MQTT sub-errors
//! - **`manager`**: link and DHCP bring-up
//! - **`sntp`**: time source for token expiry
//! - **`socket`**: DNS helper and the TCP transport for embedded-tls
//! - **`mqtt`**: IoT Hub session (TLS, CONNECT with SAS token, publish loop)

pub mod config;
pub mod error;
pub mod manager;
pub mod mqtt;
pub mod sntp;
pub mod socket;

pub use config::NetworkConfig;
pub use error::NetworkError;
pub use mqtt::{HubSession, SessionEnd};
pub use sntp::SntpClient;
