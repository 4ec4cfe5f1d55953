//! Serial frame decoding
//!
//! A frame is one `\n`-terminated ASCII line of exactly `FIELD_COUNT`
//! comma-separated decimal integers, in `TelemetryRecord` field order.
//!
//! Tokenizing follows `strtok` semantics (empty tokens are skipped) and number
//! conversion follows lenient `atoi` semantics (garbage yields 0). The token
//! count is checked before any field is written.

use heapless::Vec;

use crate::error::FrameError;
use crate::record::{TelemetryRecord, FIELD_COUNT};

/// Field delimiter
const DELIMITER: char = ',';

/// Longest line a `LineAssembler` must hold for any valid frame
///
/// Twenty `-2147483648` fields, nineteen commas and a trailing `\r` take 240
/// bytes.
pub const MAX_FRAME_LEN: usize = 256;

/// Convert a token to an integer with `atoi` semantics
///
/// Skips leading whitespace, accepts one optional sign and consumes decimal
/// digits up to the first non-digit. Returns 0 when no digits are present.
/// Saturates at the `i32` range instead of overflowing.
pub fn parse_lenient(token: &str) -> i32 {
    // C `isspace` also accepts vertical tab
    let bytes = token
        .trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '\x0B')
        .as_bytes();
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, bytes),
    };

    digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i32, |acc, &b| {
            let digit = (b - b'0') as i32;
            if negative {
                acc.saturating_mul(10).saturating_sub(digit)
            } else {
                acc.saturating_mul(10).saturating_add(digit)
            }
        })
}

/// Decode one frame into a fresh record
///
/// # Errors
///
/// Returns `FrameError::Malformed` when the line does not hold exactly
/// `FIELD_COUNT` non-empty tokens.
pub fn decode_frame(line: &str) -> Result<TelemetryRecord, FrameError> {
    let mut values = [0i32; FIELD_COUNT];
    let mut tokens = 0usize;

    for token in line.split(DELIMITER).filter(|t| !t.is_empty()) {
        if let Some(slot) = values.get_mut(tokens) {
            *slot = parse_lenient(token);
        }
        tokens += 1;
    }

    if tokens != FIELD_COUNT {
        return Err(FrameError::Malformed { tokens });
    }

    Ok(TelemetryRecord::from_values(&values))
}

impl TelemetryRecord {
    /// Overwrite every field from a frame
    ///
    /// On error the record is left exactly as it was.
    pub fn update_from_frame(&mut self, line: &str) -> Result<(), FrameError> {
        *self = decode_frame(line)?;
        Ok(())
    }
}

/// Result of feeding a line terminator to a `LineAssembler`
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// A complete line, without its `\n` or trailing `\r`
    Line(&'a str),
    /// A line exceeded the buffer and was dropped
    Overflow,
    /// A line was not valid UTF-8 and was dropped
    Invalid,
}

/// Byte-at-a-time line splitter for the serial stream
///
/// Holds at most `N` bytes of the current line. Longer lines are discarded up
/// to and including their terminator.
pub struct LineAssembler<const N: usize> {
    buf: Vec<u8, N>,
    discarding: bool,
    complete: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
            complete: false,
        }
    }

    /// Feed one byte; returns an event when it terminates a line
    pub fn push(&mut self, byte: u8) -> Option<LineEvent<'_>> {
        if self.complete {
            self.buf.clear();
            self.complete = false;
        }

        if byte == b'\n' {
            if self.discarding {
                self.discarding = false;
                return Some(LineEvent::Overflow);
            }
            self.complete = true;
            let line = match self.buf.split_last() {
                Some((b'\r', rest)) => rest,
                _ => self.buf.as_slice(),
            };
            return match core::str::from_utf8(line) {
                Ok(s) => Some(LineEvent::Line(s)),
                Err(_) => Some(LineEvent::Invalid),
            };
        }

        if !self.discarding && self.buf.push(byte).is_err() {
            self.buf.clear();
            self.discarding = true;
        }
        None
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
        self.complete = false;
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1,22,45,10,400,1,23,50,12,410,1,80,1200,1,75,1150,1,0,1,128";

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("42"), 42);
        assert_eq!(parse_lenient("  -7"), -7);
        assert_eq!(parse_lenient("+15"), 15);
        assert_eq!(parse_lenient("12abc"), 12);
        assert_eq!(parse_lenient("abc"), 0);
        assert_eq!(parse_lenient(""), 0);
        assert_eq!(parse_lenient("-"), 0);
        assert_eq!(parse_lenient("128\r"), 128);
        assert_eq!(parse_lenient("\x0B\t\x0C 31"), 31);
        assert_eq!(parse_lenient("99999999999"), i32::MAX);
        assert_eq!(parse_lenient("-99999999999"), i32::MIN);
    }

    #[test]
    fn test_decode_sample_frame() {
        let record = decode_frame(SAMPLE).unwrap();
        assert_eq!(record.sensor_1_type, 1);
        assert_eq!(record.sensor_1_temperature, 22);
        assert_eq!(record.sensor_1_humidity, 45);
        assert_eq!(record.sensor_1_light, 10);
        assert_eq!(record.sensor_1_co2, 400);
        assert_eq!(record.sensor_2_type, 1);
        assert_eq!(record.sensor_2_temperature, 23);
        assert_eq!(record.sensor_2_humidity, 50);
        assert_eq!(record.sensor_2_light, 12);
        assert_eq!(record.sensor_2_co2, 410);
        assert_eq!(record.fan_1_type, 1);
        assert_eq!(record.fan_1_set_percent, 80);
        assert_eq!(record.fan_1_speed, 1200);
        assert_eq!(record.fan_2_type, 1);
        assert_eq!(record.fan_2_set_percent, 75);
        assert_eq!(record.fan_2_speed, 1150);
        assert_eq!(record.relay_co2, 1);
        assert_eq!(record.relay_programmable_1, 0);
        assert_eq!(record.relay_programmable_2, 1);
        assert_eq!(record.pwm_light, 128);
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let nineteen = "1,22,45,10,400,1,23,50,12,410,1,80,1200,1,75,1150,1,0,1";
        assert_eq!(
            decode_frame(nineteen),
            Err(FrameError::Malformed { tokens: 19 })
        );
    }

    #[test]
    fn test_long_frame_is_malformed() {
        let twenty_one = "1,22,45,10,400,1,23,50,12,410,1,80,1200,1,75,1150,1,0,1,128,7";
        assert_eq!(
            decode_frame(twenty_one),
            Err(FrameError::Malformed { tokens: 21 })
        );
    }

    #[test]
    fn test_empty_tokens_are_skipped() {
        let doubled = "1,,22,45,10,400,1,23,50,12,410,1,80,1200,1,75,1150,1,0,1,128,";
        assert_eq!(decode_frame(doubled), decode_frame(SAMPLE));
        assert_eq!(decode_frame(""), Err(FrameError::Malformed { tokens: 0 }));
    }

    #[test]
    fn test_non_numeric_fields_decode_as_zero() {
        let line = "x,22,45,10,400,1,23,50,12,410,1,80,1200,1,75,1150,1,0,1,on";
        let record = decode_frame(line).unwrap();
        assert_eq!(record.sensor_1_type, 0);
        assert_eq!(record.pwm_light, 0);
    }

    #[test]
    fn test_failed_update_leaves_record_untouched() {
        let mut record = decode_frame(SAMPLE).unwrap();
        let before = record;
        let result = record.update_from_frame("1,2,3");
        assert_eq!(result, Err(FrameError::Malformed { tokens: 3 }));
        assert_eq!(record, before);
    }

    #[test]
    fn test_update_overwrites_all_fields() {
        let mut record = decode_frame(SAMPLE).unwrap();
        record
            .update_from_frame("2,-5,30,0,0,3,18,60,0,0,2,50,900,2,40,800,0,1,0,255")
            .unwrap();
        assert_eq!(record.sensor_1_type, 2);
        assert_eq!(record.sensor_1_temperature, -5);
        assert_eq!(record.fan_2_speed, 800);
        assert_eq!(record.pwm_light, 255);
    }

    #[test]
    fn test_assembler_yields_lines() {
        let mut asm = LineAssembler::<64>::new();
        let mut lines = 0;
        for &b in b"1,2,3\r\n4,5\n" {
            if let Some(event) = asm.push(b) {
                match (lines, event) {
                    (0, LineEvent::Line(s)) => assert_eq!(s, "1,2,3"),
                    (1, LineEvent::Line(s)) => assert_eq!(s, "4,5"),
                    (_, other) => panic!("unexpected event {:?}", other),
                }
                lines += 1;
            }
        }
        assert_eq!(lines, 2);
    }

    #[test]
    fn test_assembler_split_reads() {
        let mut asm = LineAssembler::<128>::new();
        let (first, second) = SAMPLE.as_bytes().split_at(17);
        for &b in first {
            assert!(asm.push(b).is_none());
        }
        for &b in second {
            assert!(asm.push(b).is_none());
        }
        match asm.push(b'\n') {
            Some(LineEvent::Line(s)) => assert!(decode_frame(s).is_ok()),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_widest_frame_across_reads() {
        let mut line = std::string::String::new();
        for i in 0..FIELD_COUNT {
            if i > 0 {
                line.push(',');
            }
            line.push_str("-2147483648");
        }
        line.push_str("\r\n");
        assert!(line.len() - 1 <= MAX_FRAME_LEN);

        // Delivered in 64-byte reads, as the UART DMA ring hands them over
        let mut asm = LineAssembler::<MAX_FRAME_LEN>::new();
        let mut frames = 0;
        for chunk in line.as_bytes().chunks(64) {
            for &b in chunk {
                if let Some(event) = asm.push(b) {
                    match event {
                        LineEvent::Line(s) => {
                            let record = decode_frame(s).unwrap();
                            assert_eq!(record.sensor_1_temperature, 0);
                            assert_eq!(record.values()[19], 0);
                        }
                        other => panic!("unexpected event {:?}", other),
                    }
                    frames += 1;
                }
            }
        }
        assert_eq!(frames, 1);
    }

    #[test]
    fn test_assembler_overflow_recovers() {
        let mut asm = LineAssembler::<4>::new();
        for &b in b"123456" {
            assert!(asm.push(b).is_none());
        }
        assert_eq!(asm.push(b'\n'), Some(LineEvent::Overflow));
        for &b in b"12" {
            assert!(asm.push(b).is_none());
        }
        assert_eq!(asm.push(b'\n'), Some(LineEvent::Line("12")));
    }

    #[test]
    fn test_assembler_invalid_utf8() {
        let mut asm = LineAssembler::<8>::new();
        asm.push(0xFF);
        assert_eq!(asm.push(b'\n'), Some(LineEvent::Invalid));
        asm.push(b'7');
        assert_eq!(asm.push(b'\n'), Some(LineEvent::Line("7")));
    }
}
