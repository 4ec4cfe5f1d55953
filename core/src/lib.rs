//! Platform-agnostic core logic for the serial-to-IoT-Hub telemetry bridge
//!
//! This crate contains everything the firmware does that is not hardware:
//! decoding serial frames, encoding telemetry payloads, IoT Hub naming, SAS
//! token generation and the connection state machine. It has NO hardware
//! dependencies and its tests run on the host.
//!
//! - **`record`**: the fixed 20-field `TelemetryRecord`
//! - **`frame`**: serial line assembly and positional frame decoding
//! - **`telemetry`**: JSON payload encoder and the single-owner `TelemetryState`
//! - **`hub`**: MQTT client id, user name and topic formatting
//! - **`sas`**: shared access signature tokens
//! - **`link`**: connection states, token refresh and send scheduling
//! - **`clock`**: wall-clock tracking from SNTP results
//! - **`config`**: hub connection settings

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod hub;
pub mod link;
pub mod record;
pub mod sas;
pub mod telemetry;

// Re-export commonly used types
pub use clock::WallClock;
pub use config::HubConfig;
pub use error::{ClockError, ConfigError, EncodeError, FrameError, HubError, SasError};
pub use frame::{decode_frame, LineAssembler, LineEvent, MAX_FRAME_LEN};
pub use link::{LinkState, TelemetrySchedule, TokenRefresh};
pub use record::TelemetryRecord;
pub use sas::SasToken;
pub use telemetry::{TelemetryEncoder, TelemetryState, PAYLOAD_CAPACITY};
