use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trait for device clocks whose timestamps need rescaling to milliseconds
pub trait Timebase: Clone + Send + Sync {
    /// Native ticks per millisecond.
    fn units_per_ms(&self) -> f64;

    /// Whole milliseconds, truncated.
    fn to_ms(&self, native: u64) -> u64 {
        let units = self.units_per_ms();
        if units == 1.0 {
            native
        } else if units.fract() == 0.0 && units > 1.0 {
            native / units as u64
        } else {
            (native as f64 / units).floor() as u64
        }
    }
}

/// Clock of the recording device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClock {
    Milliseconds,
    Microseconds,
    Custom { units_per_ms: f64 },
}

impl Default for DeviceClock {
    fn default() -> Self {
        DeviceClock::Milliseconds
    }
}

impl Timebase for DeviceClock {
    fn units_per_ms(&self) -> f64 {
        match self {
            DeviceClock::Milliseconds => 1.0,
            DeviceClock::Microseconds => 1000.0,
            DeviceClock::Custom { units_per_ms } if *units_per_ms > 0.0 => *units_per_ms,
            DeviceClock::Custom { .. } => 1.0,
        }
    }
}

/// Rescales native timestamps to milliseconds without reordering them.
pub fn normalize_times<T: Timebase>(clock: &T, native: impl IntoIterator<Item = u64>) -> Vec<u64> {
    native.into_iter().map(|t| clock.to_ms(t)).collect()
}

/// Bumps every timestamp that does not exceed its predecessor to
/// predecessor + 1, so no two samples share a millisecond. Returns the number
/// of timestamps moved.
pub fn enforce_strict_increase(times: &mut [u64]) -> usize {
    let mut moved = 0;
    for i in 1..times.len() {
        if times[i] <= times[i - 1] {
            times[i] = times[i - 1] + 1;
            moved += 1;
        }
    }
    if moved > 0 {
        debug!("Moved {} duplicate sample timestamps forward", moved);
    }
    moved
}
