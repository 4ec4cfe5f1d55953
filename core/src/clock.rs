//! Wall-clock tracking from SNTP results
//!
//! The board has a free-running monotonic microsecond timer but no calendar
//! time until SNTP answers. A calibration pins one SNTP timestamp to one
//! monotonic reading; later readings are extrapolated from that pair.

use crate::error::ClockError;

/// Earliest Unix time accepted from a time source (2017-11-13)
///
/// Anything earlier means the source has not synchronized yet.
pub const MIN_VALID_UNIX_SECS: u64 = 1_510_592_825;

/// Calendar time derived from a monotonic timer
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WallClock {
    anchor: Option<Anchor>,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Anchor {
    unix_micros: u64,
    mono_micros: u64,
}

impl WallClock {
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    /// Pin `unix_secs.micros` to the monotonic reading `mono_micros`
    ///
    /// # Errors
    ///
    /// Returns `ClockError::Implausible` for timestamps before
    /// `MIN_VALID_UNIX_SECS`; the previous calibration is kept.
    pub fn calibrate(
        &mut self,
        unix_secs: u64,
        micros: u32,
        mono_micros: u64,
    ) -> Result<(), ClockError> {
        if unix_secs < MIN_VALID_UNIX_SECS {
            return Err(ClockError::Implausible);
        }
        self.anchor = Some(Anchor {
            unix_micros: unix_secs
                .saturating_mul(1_000_000)
                .saturating_add(micros as u64),
            mono_micros,
        });
        Ok(())
    }

    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    /// Current Unix seconds, or `None` before the first calibration
    pub fn now_unix(&self, mono_micros: u64) -> Option<u64> {
        self.anchor.map(|a| {
            let elapsed = mono_micros.saturating_sub(a.mono_micros);
            a.unix_micros.saturating_add(elapsed) / 1_000_000
        })
    }
}
