#![deny(unsafe_code)]
#![deny(warnings)]
//! Network and session error types

use defmt::Format;
use hub_bridge_core::{HubError, SasError};

/// TLS layer failures
#[derive(Debug, Clone, Copy, Format)]
pub enum TlsError {
    /// Handshake did not complete
    HandshakeFailed,
}

/// MQTT layer failures
#[derive(Debug, Clone, Copy, Format)]
pub enum MqttError {
    /// CONNECT rejected or CONNACK not received
    ConnectionFailed,
    /// PUBLISH could not be written
    PublishFailed,
    /// String or topic rejected by the client library
    ProtocolError,
}

/// Errors that end a connection attempt or a live session
///
/// Every variant sends the agent back to `LinkState::Disconnected`.
#[derive(Debug, Clone, Copy, Format)]
pub enum NetworkError {
    /// DNS resolution failed
    DnsError,
    /// Socket bind/connect error
    SocketError,
    /// Request timeout
    Timeout,
    /// Invalid response from server
    InvalidResponse,
    /// Server error (e.g., invalid stratum for NTP)
    ServerError,
    /// All configured servers failed
    AllServersFailed,
    /// No SNTP calibration yet, so no token expiry can be computed
    ClockNotSynced,
    /// SAS token could not be signed
    Token(SasError),
    /// IoT Hub user name or topic could not be built
    Naming(HubError),
    Tls(TlsError),
    Mqtt(MqttError),
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::SocketError => write!(f, "Socket error"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::InvalidResponse => write!(f, "Invalid response"),
            Self::ServerError => write!(f, "Server error"),
            Self::AllServersFailed => write!(f, "All servers failed"),
            Self::ClockNotSynced => write!(f, "Wall clock not synchronized"),
            Self::Token(e) => write!(f, "SAS token: {}", e),
            Self::Naming(e) => write!(f, "Hub naming: {}", e),
            Self::Tls(TlsError::HandshakeFailed) => write!(f, "TLS handshake failed"),
            Self::Mqtt(MqttError::ConnectionFailed) => write!(f, "MQTT connection failed"),
            Self::Mqtt(MqttError::PublishFailed) => write!(f, "MQTT publish failed"),
            Self::Mqtt(MqttError::ProtocolError) => write!(f, "MQTT protocol error"),
        }
    }
}

impl core::error::Error for NetworkError {}

impl From<TlsError> for NetworkError {
    fn from(e: TlsError) -> Self {
        Self::Tls(e)
    }
}

impl From<MqttError> for NetworkError {
    fn from(e: MqttError) -> Self {
        Self::Mqtt(e)
    }
}

impl From<SasError> for NetworkError {
    fn from(e: SasError) -> Self {
        Self::Token(e)
    }
}

impl From<HubError> for NetworkError {
    fn from(e: HubError) -> Self {
        Self::Naming(e)
    }
}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SocketError => embedded_io_async::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Self::InvalidResponse => embedded_io_async::ErrorKind::InvalidData,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}
