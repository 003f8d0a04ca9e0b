use crate::config::SegmentationConfig;
use crate::sample::{Sample, velocity};
use gazex_core::Point;
use std::ops::Range;
use tracing::trace;

/// Confirmed fixation as an inclusive range of sample indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixationSpan {
    pub first: usize,
    pub last: usize,
    pub centroid: Point,
}

/// Candidates that did not become fixations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandidateCounts {
    /// Too short and not foldable into the previous fixation.
    pub discarded: usize,
    /// Long enough but spread too wide for a stable centroid.
    pub unstable: usize,
}

/// Mean position, or `None` when the samples spread further than
/// `max_spread` px along either axis.
pub fn stable_centroid(samples: &[Sample], max_spread: f64) -> Option<Point> {
    let first = samples.first()?;
    let (mut min_x, mut max_x) = (first.point.x, first.point.x);
    let (mut min_y, mut max_y) = (first.point.y, first.point.y);
    let (mut sum_x, mut sum_y) = (0.0, 0.0);
    for s in samples {
        min_x = min_x.min(s.point.x);
        max_x = max_x.max(s.point.x);
        min_y = min_y.min(s.point.y);
        max_y = max_y.max(s.point.y);
        sum_x += s.point.x;
        sum_y += s.point.y;
    }
    if max_x - min_x > max_spread || max_y - min_y > max_spread {
        return None;
    }
    let n = samples.len() as f64;
    Some(Point::new(sum_x / n, sum_y / n))
}

/// Running centroid of a candidate. Synthetic samples at the head of the
/// candidate (held or interpolated positions) only count until the first
/// measured sample arrives.
#[derive(Debug, Default)]
struct RunningCentroid {
    lead: (f64, f64, usize),
    measured: (f64, f64, usize),
}

impl RunningCentroid {
    fn push(&mut self, s: &Sample) {
        let acc = if s.synthetic && self.measured.2 == 0 {
            &mut self.lead
        } else {
            &mut self.measured
        };
        acc.0 += s.point.x;
        acc.1 += s.point.y;
        acc.2 += 1;
    }

    fn get(&self) -> Point {
        let (x, y, n) = if self.measured.2 > 0 {
            self.measured
        } else {
            self.lead
        };
        let n = n.max(1) as f64;
        Point::new(x / n, y / n)
    }
}

/// Dispersion/velocity segmentation of one blink-free run of samples.
/// Returned spans use indices into `samples`.
pub fn detect_fixations(
    samples: &[Sample],
    range: Range<usize>,
    config: &SegmentationConfig,
    counts: &mut CandidateCounts,
) -> Vec<FixationSpan> {
    let dispersion = config.dispersion_px();
    let mut fixations: Vec<FixationSpan> = Vec::new();
    let mut start = range.start;

    while start < range.end {
        let mut centroid = RunningCentroid::default();
        centroid.push(&samples[start]);
        let mut end = start;
        for i in start + 1..range.end {
            let moving =
                velocity(&samples[i - 1], &samples[i], &config.screen) > config.min_velocity_deg_s;
            if moving || samples[i].point.distance(&centroid.get()) > dispersion {
                break;
            }
            centroid.push(&samples[i]);
            end = i;
        }
        close_candidate(samples, start, end, config, &mut fixations, counts);
        start = end + 1;
    }
    fixations
}

fn close_candidate(
    samples: &[Sample],
    first: usize,
    last: usize,
    config: &SegmentationConfig,
    fixations: &mut Vec<FixationSpan>,
    counts: &mut CandidateCounts,
) {
    let spread = config.max_centroid_spread_px;
    let duration = samples[last].time - samples[first].time;

    if duration >= config.min_fixation_duration_ms {
        match stable_centroid(&samples[first..=last], spread) {
            Some(centroid) => fixations.push(FixationSpan {
                first,
                last,
                centroid,
            }),
            None => {
                trace!("No stable centroid for samples {}..={}", first, last);
                counts.unstable += 1;
            }
        }
        return;
    }

    // Brief false break: fold back into the previous fixation when every
    // sample since it ended still lies within its dispersion.
    if let Some(prev) = fixations.last_mut() {
        let dispersion = config.dispersion_px();
        let close = samples[prev.last + 1..=last]
            .iter()
            .all(|s| s.point.distance(&prev.centroid) <= dispersion);
        if close {
            if let Some(centroid) = stable_centroid(&samples[prev.first..=last], spread) {
                prev.last = last;
                prev.centroid = centroid;
                return;
            }
        }
    }
    counts.discarded += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Gaze resting at (300, 300) for `dwell` samples, then a 60 px/sample
    /// sweep to (900, 300) where it rests for another 40 samples.
    fn two_targets(dwell: usize, step_ms: u64) -> Vec<Sample> {
        let mut points = vec![300.0; dwell];
        points.extend((1..10).map(|k| 300.0 + 60.0 * k as f64));
        points.extend(std::iter::repeat_n(900.0, 40));
        points
            .into_iter()
            .enumerate()
            .map(|(i, x)| Sample::new(i as u64 * step_ms, x, 300.0))
            .collect()
    }

    #[test]
    fn fixation_of_minimum_duration_is_kept() {
        let config = SegmentationConfig::default();
        // 16 samples two milliseconds apart span exactly 30 ms.
        let samples = two_targets(16, 2);
        let mut counts = CandidateCounts::default();
        let fixations = detect_fixations(&samples, 0..samples.len(), &config, &mut counts);
        assert_eq!(fixations.len(), 2);
        assert_eq!((fixations[0].first, fixations[0].last), (0, 15));
        assert_eq!(fixations[0].centroid, Point::new(300.0, 300.0));
        assert_eq!(fixations[1].first, 25);
        assert_eq!(counts.discarded, 9);
    }

    #[test]
    fn fixation_one_sample_short_is_dropped() {
        let config = SegmentationConfig::default();
        let samples = two_targets(15, 2);
        let mut counts = CandidateCounts::default();
        let fixations = detect_fixations(&samples, 0..samples.len(), &config, &mut counts);
        assert_eq!(fixations.len(), 1);
        assert_eq!(fixations[0].centroid.x, 900.0);
        assert_eq!(counts.discarded, 10);
    }

    /// 1 kHz rest at (300, 300) for `dwell` samples, then a jump to
    /// (900, 300) held for 40 samples.
    fn rest_then_jump(dwell: usize) -> Vec<Sample> {
        (0..dwell + 40)
            .map(|i| {
                let x = if i < dwell { 300.0 } else { 900.0 };
                Sample::new(i as u64, x, 300.0)
            })
            .collect()
    }

    #[test]
    fn minimum_duration_at_one_khz() {
        let config = SegmentationConfig::default();

        // 31 samples span 30 ms.
        let samples = rest_then_jump(31);
        let mut counts = CandidateCounts::default();
        let fixations = detect_fixations(&samples, 0..samples.len(), &config, &mut counts);
        assert_eq!(fixations.len(), 2);
        assert_eq!((fixations[0].first, fixations[0].last), (0, 30));
        assert_eq!(counts, CandidateCounts::default());

        // 30 samples span 29 ms.
        let samples = rest_then_jump(30);
        let mut counts = CandidateCounts::default();
        let fixations = detect_fixations(&samples, 0..samples.len(), &config, &mut counts);
        assert_eq!(fixations.len(), 1);
        assert_eq!(fixations[0].first, 30);
        assert_eq!(counts.discarded, 1);
    }

    #[test]
    fn brief_break_folds_into_previous_fixation() {
        let config = SegmentationConfig::default();
        let mut samples: Vec<Sample> = (0..60).map(|i| Sample::new(i, 500.0, 500.0)).collect();
        // A small hop that trips the velocity test but stays close.
        samples[40].point.x = 520.0;
        let mut counts = CandidateCounts::default();
        let fixations = detect_fixations(&samples, 0..60, &config, &mut counts);
        assert_eq!(fixations.len(), 1);
        assert_eq!((fixations[0].first, fixations[0].last), (0, 59));
        assert_eq!(counts.discarded, 0);
    }

    #[test]
    fn unstable_centroid_rejects_candidate() {
        assert!(stable_centroid(&[Sample::new(0, 0.0, 0.0), Sample::new(1, 60.0, 0.0)], 50.0).is_none());
        let centroid = stable_centroid(&[Sample::new(0, 10.0, 0.0), Sample::new(1, 20.0, 4.0)], 50.0);
        assert_eq!(centroid, Some(Point::new(15.0, 2.0)));
    }

    #[test]
    fn leading_synthetic_samples_do_not_bias_centroid() {
        let mut centroid = RunningCentroid::default();
        centroid.push(&Sample::synthetic(0, Point::new(0.0, 0.0)));
        assert_eq!(centroid.get(), Point::new(0.0, 0.0));
        centroid.push(&Sample::new(1, 100.0, 100.0));
        centroid.push(&Sample::synthetic(2, Point::new(102.0, 100.0)));
        assert_eq!(centroid.get(), Point::new(101.0, 100.0));
    }
}
