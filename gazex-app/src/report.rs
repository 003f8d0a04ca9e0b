use gazex_aoi::{RegionFixation, aggregate_fixations};
use gazex_core::{Features, RegionSet, Trial, TrialWarning};
use gazex_segment::DataQuality;
use gazex_trial::{SkippedTrial, SubjectTrials};
use serde::Serialize;
use std::collections::BTreeMap;

/// Trial number and start time of a segmented trial.
pub type QualityKey = (u32, u64);

#[derive(Debug, Serialize)]
pub struct TrialReport<'a> {
    pub trial_number: u32,
    pub stimulus_id: &'a str,
    pub duration_ms: u64,
    pub response_time_ms: Option<u64>,
    pub features: Option<&'a Features>,
    pub fixations: usize,
    pub saccades: usize,
    pub blinks: usize,
    pub warnings: &'a [TrialWarning],
    /// Only present for recordings that went through segmentation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<&'a DataQuality>,
    pub dwells: Vec<RegionFixation<'a>>,
}

impl<'a> TrialReport<'a> {
    fn new(
        trial: &'a Trial,
        quality: Option<&'a DataQuality>,
        regions: &'a RegionSet,
        target: &str,
    ) -> Self {
        Self {
            trial_number: trial.trial_number(),
            stimulus_id: trial.stimulus_id(),
            duration_ms: trial.duration(),
            response_time_ms: trial.response_time(),
            features: trial.features(),
            fixations: trial.fixations().len(),
            saccades: trial.saccades().len(),
            blinks: trial.blinks().len(),
            warnings: trial.warnings(),
            quality,
            dwells: aggregate_fixations(trial, regions, target),
        }
    }
}

/// Everything reported for one input file.
#[derive(Debug, Serialize)]
pub struct SubjectReport<'a> {
    pub subject: &'a str,
    pub trials: Vec<TrialReport<'a>>,
    pub skipped: &'a [SkippedTrial],
    /// Mean share of artifact samples over the segmented trials
    pub artifact_ratio: Option<f64>,
}

impl<'a> SubjectReport<'a> {
    pub fn new(
        subject: &'a str,
        parsed: &'a SubjectTrials,
        quality: &'a BTreeMap<QualityKey, DataQuality>,
        regions: &'a RegionSet,
        target: &str,
    ) -> Self {
        let trials = parsed
            .trials
            .iter()
            .map(|t| {
                let key = (t.trial_number(), t.start_time());
                TrialReport::new(t, quality.get(&key), regions, target)
            })
            .collect();
        let artifact_ratio = (!quality.is_empty()).then(|| {
            quality.values().map(|q| q.artifact_ratio).sum::<f64>() / quality.len() as f64
        });
        Self {
            subject,
            trials,
            skipped: &parsed.skipped,
            artifact_ratio,
        }
    }
}
