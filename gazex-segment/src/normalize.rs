use crate::sample::{RawTrial, Sample};
use gazex_core::Entry;
use gazex_timing::{Timebase, enforce_strict_increase, normalize_times};

/// Samples and markers of one trial on the millisecond clock.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTrial {
    pub samples: Vec<Sample>,
    pub markers: Vec<Entry>,
    /// Sample timestamps moved forward to break ties.
    pub moved: usize,
}

/// Rescales the trial to milliseconds. Sample timestamps are made strictly
/// increasing; marker timestamps are only rescaled. Non-finite coordinates
/// are treated as lost signal and mapped to the origin.
pub fn normalize<T: Timebase>(raw: &RawTrial, clock: &T) -> NormalizedTrial {
    let mut times = normalize_times(clock, raw.samples.iter().map(|s| s.time));
    let moved = enforce_strict_increase(&mut times);

    let samples = raw
        .samples
        .iter()
        .zip(times)
        .map(|(s, time)| {
            if s.x.is_finite() && s.y.is_finite() {
                Sample::new(time, s.x, s.y)
            } else {
                Sample::new(time, 0.0, 0.0)
            }
        })
        .collect();

    let markers = raw
        .markers
        .iter()
        .map(|m| m.clone().with_time(clock.to_ms(m.time())))
        .collect();

    NormalizedTrial {
        samples,
        markers,
        moved,
    }
}
