//! IoT Hub MQTT naming
//!
//! IoT Hub speaks plain MQTT 3.1.1/5 with fixed conventions for the client id,
//! user name and topics. All strings are built into bounded buffers.

use core::fmt::Write;

use heapless::String;

use crate::error::HubError;

/// MQTT over TLS port
pub const HUB_PORT: u16 = 8883;

/// Service API version advertised in the user name
pub const API_VERSION: &str = "2020-09-30";

/// Longest device id IoT Hub accepts
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// User name capacity: host, device id, api-version and client type
pub const MAX_USER_NAME_LEN: usize = 256;

/// Telemetry topic capacity: prefix, device id and message properties
pub const MAX_TOPIC_LEN: usize = 192;

/// Message properties appended to every telemetry topic
///
/// IoT Hub routes on these as if they were the message content type and
/// content encoding.
pub const TELEMETRY_PROPERTIES: &str = "$.ct=application%2Fjson&$.ce=UTF-8";

/// Reject device ids that would break topic structure
pub fn validate_device_id(device_id: &str) -> Result<(), HubError> {
    if device_id.is_empty()
        || device_id.len() > MAX_DEVICE_ID_LEN
        || device_id.contains(['+', '#', '/', '\0'])
    {
        return Err(HubError::InvalidDeviceId);
    }
    Ok(())
}

/// MQTT client id; IoT Hub requires the bare device id
pub fn client_id(device_id: &str) -> Result<&str, HubError> {
    validate_device_id(device_id)?;
    Ok(device_id)
}

/// MQTT user name: `{host}/{device_id}/?api-version=...[&DeviceClientType=...]`
pub fn user_name(
    host: &str,
    device_id: &str,
    user_agent: &str,
) -> Result<String<MAX_USER_NAME_LEN>, HubError> {
    validate_device_id(device_id)?;

    let mut name = String::new();
    write!(name, "{}/{}/?api-version={}", host, device_id, API_VERSION)
        .map_err(|_| HubError::BufferFull)?;
    if !user_agent.is_empty() {
        write!(name, "&DeviceClientType={}", user_agent).map_err(|_| HubError::BufferFull)?;
    }
    Ok(name)
}

/// Device-to-cloud telemetry topic including message properties
pub fn telemetry_topic(device_id: &str) -> Result<String<MAX_TOPIC_LEN>, HubError> {
    validate_device_id(device_id)?;

    let mut topic = String::new();
    write!(
        topic,
        "devices/{}/messages/events/{}",
        device_id, TELEMETRY_PROPERTIES
    )
    .map_err(|_| HubError::BufferFull)?;
    Ok(topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "example-hub.azure-devices.net";

    #[test]
    fn test_user_name() {
        let name = user_name(HOST, "sensor-node-01", "").unwrap();
        assert_eq!(
            name.as_str(),
            "example-hub.azure-devices.net/sensor-node-01/?api-version=2020-09-30"
        );

        let name = user_name(HOST, "sensor-node-01", "hub-bridge%2F0.1.0").unwrap();
        assert!(name.ends_with("?api-version=2020-09-30&DeviceClientType=hub-bridge%2F0.1.0"));
    }

    #[test]
    fn test_telemetry_topic() {
        let topic = telemetry_topic("sensor-node-01").unwrap();
        assert_eq!(
            topic.as_str(),
            "devices/sensor-node-01/messages/events/$.ct=application%2Fjson&$.ce=UTF-8"
        );
    }

    #[test]
    fn test_client_id_is_device_id() {
        assert_eq!(client_id("sensor-node-01"), Ok("sensor-node-01"));
    }

    #[test]
    fn test_invalid_device_ids() {
        for id in ["", "a+b", "a#b", "a/b", "a\0b"] {
            assert_eq!(telemetry_topic(id), Err(HubError::InvalidDeviceId));
        }
        let long = "x".repeat(MAX_DEVICE_ID_LEN + 1);
        assert_eq!(validate_device_id(&long), Err(HubError::InvalidDeviceId));
    }

    #[test]
    fn test_user_name_overflow() {
        let long_host = "h".repeat(MAX_USER_NAME_LEN);
        assert_eq!(
            user_name(&long_host, "dev", ""),
            Err(HubError::BufferFull)
        );
    }
}
