pub mod clock;
pub mod stats;

pub use clock::{DeviceClock, Timebase, enforce_strict_increase, normalize_times};
pub use stats::{SamplingStats, sampling_stats};
