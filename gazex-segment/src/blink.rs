use crate::config::SegmentationConfig;
use crate::sample::{Sample, velocity};
use std::ops::Range;
use tracing::debug;

/// Confirmed blink as an inclusive range of sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkSpan {
    pub first: usize,
    pub last: usize,
}

impl BlinkSpan {
    pub fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }
}

pub(crate) fn is_candidate(s: &Sample, threshold: f64) -> bool {
    s.point.x.abs() < threshold && s.point.y.abs() < threshold
}

/// Maximal runs of consecutive blink candidates.
fn candidate_runs(samples: &[Sample], threshold: f64) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, s) in samples.iter().enumerate() {
        match (is_candidate(s, threshold), start) {
            (true, None) => start = Some(i),
            (false, Some(begin)) => {
                runs.push(begin..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        runs.push(begin..samples.len());
    }
    runs
}

struct Refiner<'a> {
    samples: &'a [Sample],
    config: &'a SegmentationConfig,
}

impl Refiner<'_> {
    fn calm(&self, a: usize, b: usize) -> bool {
        velocity(&self.samples[a], &self.samples[b], &self.config.screen)
            < self.config.min_velocity_deg_s
    }

    fn lost(&self, i: usize) -> bool {
        is_candidate(&self.samples[i], self.config.blink_threshold_px)
    }

    /// Walks back from the run to where the eye was still at rest. Fast
    /// samples leading into the closure become part of the blink.
    fn start(&self, run_start: usize, floor: usize) -> usize {
        let window = self.config.stabilization_samples.max(1);
        let mut stable = 0;
        let mut top = run_start;
        let mut j = run_start;
        while j > floor + 1 {
            j -= 1;
            if self.lost(j) || self.lost(j - 1) {
                break;
            }
            if self.calm(j - 1, j) {
                if stable == 0 {
                    top = j;
                }
                stable += 1;
                if stable >= window {
                    return top + 1;
                }
            } else {
                stable = 0;
            }
        }
        run_start
    }

    /// Mirror of `start`, walking forward from the run's last sample.
    fn end(&self, run_last: usize, ceil: usize) -> usize {
        let window = self.config.stabilization_samples.max(1);
        let mut stable = 0;
        let mut bottom = run_last;
        let mut j = run_last;
        while j + 1 < ceil {
            j += 1;
            if self.lost(j) || self.lost(j + 1) {
                break;
            }
            if self.calm(j, j + 1) {
                if stable == 0 {
                    bottom = j;
                }
                stable += 1;
                if stable >= window {
                    return bottom - 1;
                }
            } else {
                stable = 0;
            }
        }
        run_last
    }
}

/// Finds blinks: runs of lost-signal samples at least `min_blink_samples`
/// long, widened to cover the eyelid movement around them. Shorter runs are
/// left for artifact removal.
pub fn detect_blinks(samples: &[Sample], config: &SegmentationConfig, unit_ms: u64) -> Vec<BlinkSpan> {
    let min_len = config.min_blink_samples(unit_ms);
    let runs: Vec<Range<usize>> = candidate_runs(samples, config.blink_threshold_px)
        .into_iter()
        .filter(|r| r.len() >= min_len)
        .collect();

    let refiner = Refiner { samples, config };
    let mut blinks: Vec<BlinkSpan> = Vec::with_capacity(runs.len());
    for (i, run) in runs.iter().enumerate() {
        let floor = blinks.last().map_or(0, |b| b.last + 1);
        let ceil = runs.get(i + 1).map_or(samples.len() - 1, |next| next.start - 1);
        let first = refiner.start(run.start, floor).max(floor);
        let last = refiner.end(run.end - 1, ceil).min(ceil);
        debug!(
            "Blink over samples {}..={} (lost signal {}..{})",
            first, last, run.start, run.end
        );
        blinks.push(BlinkSpan { first, last });
    }
    blinks
}

/// Replaces the samples inside each blink by a straight line between the
/// samples around it. At the trial edges the neighbouring position is held.
pub fn interpolate_blinks(samples: &mut [Sample], blinks: &[BlinkSpan]) {
    for blink in blinks {
        let before = blink.first.checked_sub(1).map(|i| samples[i]);
        let after = samples.get(blink.last + 1).copied();
        for i in blink.first..=blink.last {
            let time = samples[i].time;
            let point = match (before, after) {
                (Some(a), Some(b)) => {
                    let t = (time - a.time) as f64 / (b.time - a.time) as f64;
                    a.point.lerp(&b.point, t)
                }
                (Some(a), None) => a.point,
                (None, Some(b)) => b.point,
                (None, None) => samples[i].point,
            };
            samples[i] = Sample::synthetic(time, point);
        }
    }
}
