use crate::blink::BlinkSpan;
use crate::config::SegmentationConfig;
use crate::fixation::{FixationSpan, stable_centroid};
use crate::sample::Sample;
use gazex_core::Point;
use std::collections::VecDeque;
use tracing::trace;

/// Synthetic saccade emitted after the sample at index `after`.
#[derive(Debug, Clone, PartialEq)]
pub struct SaccadeSpan {
    pub after: usize,
    pub start: u64,
    pub end: u64,
    /// Interpolated positions strictly between `start` and `end`.
    pub path: Vec<Sample>,
}

/// Main-sequence duration estimate for a saccade of `amplitude_deg`,
/// rounded to a whole number of sampling periods (at least one).
pub fn carpenter_duration_ms(amplitude_deg: f64, config: &SegmentationConfig, unit_ms: u64) -> u64 {
    let unit = unit_ms.max(1);
    let estimate = config.saccade_slope_ms_per_deg * amplitude_deg + config.saccade_intercept_ms;
    let periods = (estimate / unit as f64).round().max(1.0) as u64;
    periods * unit
}

/// Saccade between the last sample of one fixation and the first of the
/// next, or `None` when they are a single sampling period apart. The
/// duration is the actual gap capped at the Carpenter estimate; coincident
/// samples get the full estimate.
pub fn plan_saccade(
    from: &Sample,
    to: &Sample,
    config: &SegmentationConfig,
    unit_ms: u64,
) -> Option<SaccadeSpan> {
    let unit = unit_ms.max(1);
    let gap = to.time.saturating_sub(from.time);
    if gap > 0 && gap <= unit {
        return None;
    }
    let amplitude = config.screen.px_to_deg(from.point.distance(&to.point));
    let estimate = carpenter_duration_ms(amplitude, config, unit);
    let duration = if gap == 0 { estimate } else { gap.min(estimate) };
    let start = from.time;
    let end = start + duration;
    Some(SaccadeSpan {
        after: 0,
        start,
        end,
        path: sweep(from.point, to.point, start, end, unit),
    })
}

fn sweep(from: Point, to: Point, start: u64, end: u64, unit: u64) -> Vec<Sample> {
    let span = (end - start) as f64;
    (1..)
        .map(|k| start + k * unit)
        .take_while(|&t| t < end)
        .map(|t| Sample::synthetic(t, from.lerp(&to, (t - start) as f64 / span)))
        .collect()
}

/// Fixations after reconciling neighbours, plus the saccades between them.
#[derive(Debug, Clone, Default)]
pub struct Linked {
    pub fixations: Vec<FixationSpan>,
    pub saccades: Vec<SaccadeSpan>,
    pub merged: usize,
}

/// Walks consecutive fixation pairs. Pairs split by a blink stay apart.
/// Pairs one sampling period apart merge when the second starts inside the
/// first's dispersion; otherwise both are kept as they are. Wider gaps get a
/// synthetic saccade.
pub fn link_fixations(
    samples: &[Sample],
    fixations: Vec<FixationSpan>,
    blinks: &[BlinkSpan],
    config: &SegmentationConfig,
    unit_ms: u64,
) -> Linked {
    let unit = unit_ms.max(1);
    let dispersion = config.dispersion_px();
    let mut pending: VecDeque<FixationSpan> = fixations.into();
    let mut linked = Linked::default();

    while let Some(next) = pending.pop_front() {
        let Some(prev) = linked.fixations.last_mut() else {
            linked.fixations.push(next);
            continue;
        };
        if blinks
            .iter()
            .any(|b| b.first > prev.last && b.last < next.first)
        {
            linked.fixations.push(next);
            continue;
        }

        let (a, b) = (&samples[prev.last], &samples[next.first]);
        let gap = b.time - a.time;
        if gap <= unit {
            if b.point.distance(&prev.centroid) <= dispersion {
                if let Some(centroid) =
                    stable_centroid(&samples[prev.first..=next.last], config.max_centroid_spread_px)
                {
                    trace!("Merging fixations at samples {} and {}", prev.last, next.first);
                    prev.last = next.last;
                    prev.centroid = centroid;
                    linked.merged += 1;
                    continue;
                }
            }
            linked.fixations.push(next);
            continue;
        }

        if let Some(mut saccade) = plan_saccade(a, b, config, unit) {
            saccade.after = prev.last;
            linked.saccades.push(saccade);
        }
        linked.fixations.push(next);
    }
    linked
}
