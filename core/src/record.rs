//! Fixed-layout telemetry record
//!
//! The field order is the contract with the serial producer: position N of an
//! input frame always maps to field N below.

/// Number of positional fields in a frame
pub const FIELD_COUNT: usize = 20;

/// Snapshot of sensor, fan, relay and light state
///
/// Fields are grouped as two sensors, two fans and the output stage. Values
/// are raw integers exactly as reported by the serial producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    // Sensor 1
    pub sensor_1_type: u8,
    pub sensor_1_temperature: i16,
    pub sensor_1_humidity: u8,
    pub sensor_1_light: u8,
    pub sensor_1_co2: u16,
    // Sensor 2
    pub sensor_2_type: u8,
    pub sensor_2_temperature: i16,
    pub sensor_2_humidity: u8,
    pub sensor_2_light: u8,
    pub sensor_2_co2: u16,
    // Fan 1
    pub fan_1_type: u8,
    pub fan_1_set_percent: u8,
    pub fan_1_speed: u16,
    // Fan 2
    pub fan_2_type: u8,
    pub fan_2_set_percent: u8,
    pub fan_2_speed: u16,
    // Outputs
    pub relay_co2: u8,
    pub relay_programmable_1: u8,
    pub relay_programmable_2: u8,
    pub pwm_light: u8,
}

impl TelemetryRecord {
    /// All fields zero; the state before the first frame arrives
    pub const ZERO: Self = Self::from_values(&[0; FIELD_COUNT]);

    /// Build a record from positional values
    ///
    /// Each value is narrowed to its field width with two's-complement
    /// truncation, the same as a C integer assignment.
    pub const fn from_values(v: &[i32; FIELD_COUNT]) -> Self {
        Self {
            sensor_1_type: v[0] as u8,
            sensor_1_temperature: v[1] as i16,
            sensor_1_humidity: v[2] as u8,
            sensor_1_light: v[3] as u8,
            sensor_1_co2: v[4] as u16,
            sensor_2_type: v[5] as u8,
            sensor_2_temperature: v[6] as i16,
            sensor_2_humidity: v[7] as u8,
            sensor_2_light: v[8] as u8,
            sensor_2_co2: v[9] as u16,
            fan_1_type: v[10] as u8,
            fan_1_set_percent: v[11] as u8,
            fan_1_speed: v[12] as u16,
            fan_2_type: v[13] as u8,
            fan_2_set_percent: v[14] as u8,
            fan_2_speed: v[15] as u16,
            relay_co2: v[16] as u8,
            relay_programmable_1: v[17] as u8,
            relay_programmable_2: v[18] as u8,
            pwm_light: v[19] as u8,
        }
    }

    /// Positional values in frame order
    pub fn values(&self) -> [i32; FIELD_COUNT] {
        [
            self.sensor_1_type as i32,
            self.sensor_1_temperature as i32,
            self.sensor_1_humidity as i32,
            self.sensor_1_light as i32,
            self.sensor_1_co2 as i32,
            self.sensor_2_type as i32,
            self.sensor_2_temperature as i32,
            self.sensor_2_humidity as i32,
            self.sensor_2_light as i32,
            self.sensor_2_co2 as i32,
            self.fan_1_type as i32,
            self.fan_1_set_percent as i32,
            self.fan_1_speed as i32,
            self.fan_2_type as i32,
            self.fan_2_set_percent as i32,
            self.fan_2_speed as i32,
            self.relay_co2 as i32,
            self.relay_programmable_1 as i32,
            self.relay_programmable_2 as i32,
            self.pwm_light as i32,
        ]
    }
}
