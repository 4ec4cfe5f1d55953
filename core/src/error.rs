//! Error types for the core telemetry logic

/// Serial frame decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Line did not contain exactly `FIELD_COUNT` tokens
    Malformed {
        /// Number of non-empty tokens found
        tokens: usize,
    },
}

/// Telemetry payload encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Serialized JSON would not fit in the output buffer
    PayloadTooLarge,
}

/// IoT Hub naming errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HubError {
    /// Device id is empty or contains MQTT wildcard, separator or NUL characters
    InvalidDeviceId,
    /// Formatted string exceeds its fixed capacity
    BufferFull,
}

/// SAS token generation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SasError {
    /// Device key is empty or not valid base64
    InvalidKey,
    /// Token exceeds its fixed capacity
    BufferFull,
}

/// Wall-clock errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Time source reported a timestamp before the plausibility threshold
    Implausible,
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Hub host name is empty
    MissingHost,
    /// Device id is unusable in MQTT topics
    InvalidDeviceId,
    /// Device key is not valid base64
    InvalidDeviceKey,
    /// Telemetry interval is zero
    ZeroInterval,
    /// Refresh margin leaves no usable token lifetime
    RefreshMarginTooLarge,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed { tokens } => {
                write!(f, "Malformed frame: expected 20 fields, got {}", tokens)
            }
        }
    }
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PayloadTooLarge => write!(f, "Payload too large"),
        }
    }
}

impl core::fmt::Display for HubError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidDeviceId => write!(f, "Invalid device id"),
            Self::BufferFull => write!(f, "Hub string buffer full"),
        }
    }
}

impl core::fmt::Display for SasError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "Invalid device key"),
            Self::BufferFull => write!(f, "SAS token buffer full"),
        }
    }
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Implausible => write!(f, "Implausible time source"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingHost => write!(f, "Hub host not configured"),
            Self::InvalidDeviceId => write!(f, "Invalid device id"),
            Self::InvalidDeviceKey => write!(f, "Invalid device key"),
            Self::ZeroInterval => write!(f, "Telemetry interval is zero"),
            Self::RefreshMarginTooLarge => write!(f, "Refresh margin exceeds token lifetime"),
        }
    }
}

impl core::error::Error for FrameError {}
impl core::error::Error for EncodeError {}
impl core::error::Error for HubError {}
impl core::error::Error for SasError {}
impl core::error::Error for ClockError {}
impl core::error::Error for ConfigError {}

impl From<HubError> for ConfigError {
    fn from(_: HubError) -> Self {
        ConfigError::InvalidDeviceId
    }
}

impl From<SasError> for ConfigError {
    fn from(_: SasError) -> Self {
        ConfigError::InvalidDeviceKey
    }
}
