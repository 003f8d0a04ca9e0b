use crate::artifact::remove_artifacts;
use crate::blink::{BlinkSpan, detect_blinks, interpolate_blinks};
use crate::config::SegmentationConfig;
use crate::fixation::{CandidateCounts, detect_fixations};
use crate::normalize::normalize;
use crate::saccade::link_fixations;
use crate::sample::RawTrial;
use crate::splice::{assemble_body, splice_markers};
use gazex_core::Entry;
use gazex_timing::sampling_stats;
use serde::Serialize;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum SegmentationError {
    #[error("degenerate trial: {reason}")]
    Degenerate { reason: String },

    #[error("no StartTrial among the trial's device messages")]
    MissingTrialStart,
}

/// Per-trial data quality, reported to the caller alongside the entries.
/// Nothing here rejects a trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQuality {
    pub sample_count: usize,
    pub artifact_count: usize,
    /// Share of samples replaced as artifacts
    pub artifact_ratio: f64,
    pub blink_count: usize,
    pub fixation_count: usize,
    pub saccade_count: usize,
    pub merged_fixations: usize,
    pub discarded_candidates: usize,
    pub unstable_candidates: usize,
    pub sample_unit_ms: u64,
    /// Sample timestamps moved forward to keep them strictly increasing
    pub moved_timestamps: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedTrial {
    pub entries: Vec<Entry>,
    pub quality: DataQuality,
}

/// Sample ranges between blinks.
fn clear_runs(len: usize, blinks: &[BlinkSpan]) -> Vec<Range<usize>> {
    let mut runs = Vec::with_capacity(blinks.len() + 1);
    let mut from = 0;
    for blink in blinks {
        if blink.first > from {
            runs.push(from..blink.first);
        }
        from = blink.last + 1;
    }
    if from < len {
        runs.push(from..len);
    }
    runs
}

/// Turns one trial of raw samples into a parser-ready entry stream:
/// timestamps normalized, blinks detected and bridged, artifacts
/// interpolated, fixations found and joined by synthetic saccades, and the
/// device messages spliced back in.
pub fn segment(raw: &RawTrial, config: &SegmentationConfig) -> Result<SegmentedTrial, SegmentationError> {
    let normalized = normalize(raw, &config.clock);
    let mut samples = normalized.samples;
    if samples.len() < 2 {
        return Err(SegmentationError::Degenerate {
            reason: format!("{} samples", samples.len()),
        });
    }

    let times: Vec<u64> = samples.iter().map(|s| s.time).collect();
    let stats = sampling_stats(&times);
    let unit = config.sample_unit_ms.unwrap_or(stats.sample_unit_ms).max(1);

    let blinks = detect_blinks(&samples, config, unit);
    let runs = clear_runs(samples.len(), &blinks);

    let artifact_count: usize = runs
        .iter()
        .map(|run| remove_artifacts(&mut samples[run.clone()], config))
        .sum();
    interpolate_blinks(&mut samples, &blinks);

    let mut counts = CandidateCounts::default();
    let mut fixations = Vec::new();
    for run in &runs {
        fixations.extend(detect_fixations(&samples, run.clone(), config, &mut counts));
    }
    let linked = link_fixations(&samples, fixations, &blinks, config, unit);

    let body = assemble_body(&samples, &blinks, &linked.fixations, &linked.saccades);
    let entries = splice_markers(body, normalized.markers)?;

    let quality = DataQuality {
        sample_count: samples.len(),
        artifact_count,
        artifact_ratio: artifact_count as f64 / samples.len() as f64,
        blink_count: blinks.len(),
        fixation_count: linked.fixations.len(),
        saccade_count: linked.saccades.len(),
        merged_fixations: linked.merged,
        discarded_candidates: counts.discarded,
        unstable_candidates: counts.unstable,
        sample_unit_ms: unit,
        moved_timestamps: normalized.moved,
    };
    debug!(
        "Segmented {} samples at {} ms: {} fixations, {} saccades, {} blinks, {:.1}% artifacts",
        quality.sample_count,
        unit,
        quality.fixation_count,
        quality.saccade_count,
        quality.blink_count,
        quality.artifact_ratio * 100.0
    );
    Ok(SegmentedTrial { entries, quality })
}
