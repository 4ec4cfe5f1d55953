//! Telemetry payload encoding
//!
//! Produces one compact JSON object per publish:
//!
//! ```text
//! {"msgCount":0,"sensor_1_type":"1","sensor_1_temperature":22,...,"pwm_light":128}
//! ```
//!
//! The type codes and programmable relay flags are emitted as quoted decimal
//! strings; every other field is a JSON number. Cloud-side consumers of the
//! existing devices depend on that split.

use serde::{Serialize, Serializer};

use crate::error::{EncodeError, FrameError};
use crate::record::TelemetryRecord;

/// Size of the publish buffer handed to the MQTT client
pub const PAYLOAD_CAPACITY: usize = 1024;

/// A `u8` serialized as a quoted decimal string
#[derive(Clone, Copy)]
struct Quoted(u8);

impl Serialize for Quoted {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

/// Wire layout of one telemetry message
#[derive(Serialize)]
struct Payload {
    #[serde(rename = "msgCount")]
    msg_count: u32,
    sensor_1_type: Quoted,
    sensor_1_temperature: i16,
    #[serde(rename = "sensors_1_humidity")]
    sensor_1_humidity: u8,
    sensor_1_light: u8,
    #[serde(rename = "sensor_1_CO2")]
    sensor_1_co2: u16,
    sensor_2_type: Quoted,
    sensor_2_temperature: i16,
    #[serde(rename = "sensors_2_humidity")]
    sensor_2_humidity: u8,
    sensor_2_light: u8,
    #[serde(rename = "sensor_2_CO2")]
    sensor_2_co2: u16,
    fan_1_type: Quoted,
    fan_1_set_percent: u8,
    fan_1_speed: u16,
    fan_2_type: Quoted,
    fan_2_set_percent: u8,
    fan_2_speed: u16,
    #[serde(rename = "relay_CO2")]
    relay_co2: u8,
    relay_programmable_1: Quoted,
    relay_programmable_2: Quoted,
    pwm_light: u8,
}

impl Payload {
    fn new(msg_count: u32, r: &TelemetryRecord) -> Self {
        Self {
            msg_count,
            sensor_1_type: Quoted(r.sensor_1_type),
            sensor_1_temperature: r.sensor_1_temperature,
            sensor_1_humidity: r.sensor_1_humidity,
            sensor_1_light: r.sensor_1_light,
            sensor_1_co2: r.sensor_1_co2,
            sensor_2_type: Quoted(r.sensor_2_type),
            sensor_2_temperature: r.sensor_2_temperature,
            sensor_2_humidity: r.sensor_2_humidity,
            sensor_2_light: r.sensor_2_light,
            sensor_2_co2: r.sensor_2_co2,
            fan_1_type: Quoted(r.fan_1_type),
            fan_1_set_percent: r.fan_1_set_percent,
            fan_1_speed: r.fan_1_speed,
            fan_2_type: Quoted(r.fan_2_type),
            fan_2_set_percent: r.fan_2_set_percent,
            fan_2_speed: r.fan_2_speed,
            relay_co2: r.relay_co2,
            relay_programmable_1: Quoted(r.relay_programmable_1),
            relay_programmable_2: Quoted(r.relay_programmable_2),
            pwm_light: r.pwm_light,
        }
    }
}

/// JSON encoder carrying the running message counter
#[derive(Debug, Default)]
pub struct TelemetryEncoder {
    next_count: u32,
}

impl TelemetryEncoder {
    pub const fn new() -> Self {
        Self { next_count: 0 }
    }

    /// Counter value the next message will carry
    pub fn message_count(&self) -> u32 {
        self.next_count
    }

    /// Serialize `record` into `buf`, returning the payload length
    ///
    /// The counter advances on every call, including failed ones.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::PayloadTooLarge` when the object does not fit in
    /// `buf`. Nothing is truncated.
    pub fn encode(&mut self, record: &TelemetryRecord, buf: &mut [u8]) -> Result<usize, EncodeError> {
        let count = self.next_count;
        self.next_count = self.next_count.wrapping_add(1);

        serde_json_core::to_slice(&Payload::new(count, record), buf)
            .map_err(|_| EncodeError::PayloadTooLarge)
    }
}

/// The record and the message counter, owned together
///
/// Exactly one task holds this value. Frames and publishes go through it, so
/// the single-writer rule is enforced by ownership rather than by locks.
#[derive(Debug, Default)]
pub struct TelemetryState {
    record: TelemetryRecord,
    encoder: TelemetryEncoder,
}

impl TelemetryState {
    pub const fn new() -> Self {
        Self {
            record: TelemetryRecord::ZERO,
            encoder: TelemetryEncoder::new(),
        }
    }

    /// Decode a frame into the owned record
    pub fn apply_frame(&mut self, line: &str) -> Result<(), FrameError> {
        self.record.update_from_frame(line)
    }

    /// Replace the owned record with one decoded elsewhere
    pub fn replace(&mut self, record: TelemetryRecord) {
        self.record = record;
    }

    pub fn record(&self) -> &TelemetryRecord {
        &self.record
    }

    pub fn message_count(&self) -> u32 {
        self.encoder.message_count()
    }

    /// Encode the current record; see `TelemetryEncoder::encode`
    pub fn encode(&mut self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        self.encoder.encode(&self.record, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decode_frame;

    const SAMPLE: &str = "1,22,45,10,400,1,23,50,12,410,1,80,1200,1,75,1150,1,0,1,128";

    const SAMPLE_JSON: &str = concat!(
        "{\"msgCount\":0,",
        "\"sensor_1_type\":\"1\",\"sensor_1_temperature\":22,\"sensors_1_humidity\":45,",
        "\"sensor_1_light\":10,\"sensor_1_CO2\":400,",
        "\"sensor_2_type\":\"1\",\"sensor_2_temperature\":23,\"sensors_2_humidity\":50,",
        "\"sensor_2_light\":12,\"sensor_2_CO2\":410,",
        "\"fan_1_type\":\"1\",\"fan_1_set_percent\":80,\"fan_1_speed\":1200,",
        "\"fan_2_type\":\"1\",\"fan_2_set_percent\":75,\"fan_2_speed\":1150,",
        "\"relay_CO2\":1,\"relay_programmable_1\":\"0\",\"relay_programmable_2\":\"1\",",
        "\"pwm_light\":128}"
    );

    /// JSON names in frame order
    const FIELD_NAMES: [&str; 20] = [
        "sensor_1_type",
        "sensor_1_temperature",
        "sensors_1_humidity",
        "sensor_1_light",
        "sensor_1_CO2",
        "sensor_2_type",
        "sensor_2_temperature",
        "sensors_2_humidity",
        "sensor_2_light",
        "sensor_2_CO2",
        "fan_1_type",
        "fan_1_set_percent",
        "fan_1_speed",
        "fan_2_type",
        "fan_2_set_percent",
        "fan_2_speed",
        "relay_CO2",
        "relay_programmable_1",
        "relay_programmable_2",
        "pwm_light",
    ];

    /// Positions emitted as quoted strings
    const QUOTED: [usize; 6] = [0, 5, 10, 13, 17, 18];

    fn encode_to_string(state: &mut TelemetryState) -> std::string::String {
        let mut buf = [0u8; PAYLOAD_CAPACITY];
        let len = state.encode(&mut buf).unwrap();
        std::str::from_utf8(&buf[..len]).unwrap().to_owned()
    }

    /// Pull the raw JSON value following `"name":`
    fn field<'a>(json: &'a str, name: &str) -> &'a str {
        let key = std::format!("\"{}\":", name);
        let start = json.find(&key).unwrap() + key.len();
        let rest = &json[start..];
        let end = rest.find([',', '}']).unwrap();
        &rest[..end]
    }

    #[test]
    fn test_encode_sample() {
        let mut state = TelemetryState::new();
        state.apply_frame(SAMPLE).unwrap();
        assert_eq!(encode_to_string(&mut state), SAMPLE_JSON);
    }

    #[test]
    fn test_decode_encode_preserves_values() {
        let line = "255,-40,100,255,65535,7,125,99,250,1000,3,100,65535,4,55,900,1,1,0,200";
        let mut state = TelemetryState::new();
        state.apply_frame(line).unwrap();
        let json = encode_to_string(&mut state);

        for (i, (name, value)) in FIELD_NAMES.iter().zip(state.record().values()).enumerate() {
            let expected = if QUOTED.contains(&i) {
                std::format!("\"{}\"", value)
            } else {
                std::format!("{}", value)
            };
            assert_eq!(field(&json, name), expected, "{}", name);
        }
        assert_eq!(state.record().values()[0], 255);
        assert_eq!(state.record().values()[15], 900);
    }

    #[test]
    fn test_counter_increments_per_encode() {
        let mut state = TelemetryState::new();
        state.apply_frame(SAMPLE).unwrap();
        let first = encode_to_string(&mut state);
        state
            .apply_frame("2,21,40,9,390,2,22,48,11,400,2,70,1100,2,65,1050,0,1,0,64")
            .unwrap();
        let second = encode_to_string(&mut state);

        assert_eq!(field(&first, "msgCount"), "0");
        assert_eq!(field(&second, "msgCount"), "1");
        assert_eq!(state.message_count(), 2);
    }

    #[test]
    fn test_payload_too_large_still_advances_counter() {
        let mut state = TelemetryState::new();
        let mut small = [0u8; 32];
        assert_eq!(state.encode(&mut small), Err(EncodeError::PayloadTooLarge));
        assert_eq!(state.message_count(), 1);

        let json = encode_to_string(&mut state);
        assert_eq!(field(&json, "msgCount"), "1");
    }

    #[test]
    fn test_malformed_frame_keeps_previous_record() {
        let mut state = TelemetryState::new();
        state.apply_frame(SAMPLE).unwrap();
        let before = *state.record();
        assert!(state.apply_frame("1,22,45").is_err());
        assert_eq!(*state.record(), before);
        assert_eq!(encode_to_string(&mut state), SAMPLE_JSON);
    }

    #[test]
    fn test_replace_and_encoder_directly() {
        let mut encoder = TelemetryEncoder::new();
        let record = decode_frame(SAMPLE).unwrap();
        let mut buf = [0u8; PAYLOAD_CAPACITY];
        let len = encoder.encode(&record, &mut buf).unwrap();
        assert_eq!(&buf[..len], SAMPLE_JSON.as_bytes());

        let mut state = TelemetryState::new();
        state.replace(record);
        assert_eq!(*state.record(), record);
    }

    #[test]
    fn test_counter_wraps() {
        let mut encoder = TelemetryEncoder { next_count: u32::MAX };
        let mut buf = [0u8; PAYLOAD_CAPACITY];
        encoder.encode(&TelemetryRecord::default(), &mut buf).unwrap();
        assert_eq!(encoder.message_count(), 0);
    }
}
