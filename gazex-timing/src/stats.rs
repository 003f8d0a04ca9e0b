use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interval statistics of a normalized sample clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingStats {
    pub average_interval_ms: f64,
    pub jitter_ms: f64,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub effective_hz: f64,
    /// Most frequent positive interval; the grid synthetic samples are laid on.
    pub sample_unit_ms: u64,
}

impl Default for SamplingStats {
    fn default() -> Self {
        Self {
            average_interval_ms: 0.0,
            jitter_ms: 0.0,
            min_interval_ms: 0,
            max_interval_ms: 0,
            effective_hz: 0.0,
            sample_unit_ms: 1,
        }
    }
}

pub fn sampling_stats(times: &[u64]) -> SamplingStats {
    let intervals: Vec<u64> = times
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]))
        .collect();
    if intervals.is_empty() {
        return SamplingStats::default();
    }

    let n = intervals.len() as f64;
    let avg = intervals.iter().sum::<u64>() as f64 / n;
    let var = intervals
        .iter()
        .map(|&d| (d as f64 - avg).powi(2))
        .sum::<f64>()
        / n;
    let min = intervals.iter().copied().min().unwrap_or(0);
    let max = intervals.iter().copied().max().unwrap_or(0);

    let mut counts: HashMap<u64, usize> = HashMap::new();
    for &d in intervals.iter().filter(|&&d| d > 0) {
        *counts.entry(d).or_insert(0) += 1;
    }
    // Ties go to the shorter interval so the grid never gets coarser than the device.
    let sample_unit_ms = counts
        .into_iter()
        .max_by(|(da, ca), (db, cb)| ca.cmp(cb).then(db.cmp(da)))
        .map(|(d, _)| d)
        .unwrap_or(1);

    SamplingStats {
        average_interval_ms: avg,
        jitter_ms: var.sqrt(),
        min_interval_ms: min,
        max_interval_ms: max,
        effective_hz: if avg > 0.0 { 1000.0 / avg } else { 0.0 },
        sample_unit_ms,
    }
}
