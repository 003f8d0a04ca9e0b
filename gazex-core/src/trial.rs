use crate::entry::{Entry, Features};
use crate::error::{IntervalError, TrialError};
use crate::interval::{Interval, IntervalKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Anomalies that were resolved locally while building a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrialWarning {
    /// An interval was opened but StopTrial arrived before its end marker.
    UnresolvedInterval { interval: IntervalKind, begin: usize },
    /// An end marker arrived with no matching start.
    UnmatchedEnd { interval: IntervalKind, index: usize },
    /// A closed interval broke the interval invariants and was discarded.
    InvalidInterval { reason: String },
    /// An entry failed validation and was dropped.
    MalformedEntry { reason: String },
}

impl From<IntervalError> for TrialWarning {
    fn from(err: IntervalError) -> Self {
        TrialWarning::InvalidInterval {
            reason: err.to_string(),
        }
    }
}

/// One stimulus presentation: the ordered entries between StartTrial and
/// StopTrial plus the intervals derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    entries: Vec<Entry>,
    fixations: Vec<Interval>,
    saccades: Vec<Interval>,
    blinks: Vec<Interval>,
    features: Option<Features>,
    warnings: Vec<TrialWarning>,
}

impl Trial {
    /// Assembles a trial from parsed parts, checking the StartTrial/StopTrial
    /// framing and reading the trial features.
    pub fn from_parts(
        entries: Vec<Entry>,
        mut intervals: Vec<Interval>,
        warnings: Vec<TrialWarning>,
    ) -> Result<Self, TrialError> {
        let trial_number = match entries.first() {
            Some(Entry::StartTrial { trial_number, .. }) => Some(*trial_number),
            _ => None,
        };
        if trial_number.is_none() {
            return Err(TrialError::Malformed {
                trial_number,
                reason: "first entry is not StartTrial".into(),
            });
        }
        if !entries.last().is_some_and(Entry::is_trial_stop) {
            return Err(TrialError::Malformed {
                trial_number,
                reason: "last entry is not StopTrial".into(),
            });
        }

        intervals.sort_by_key(|i| i.begin);
        let mut trial = Trial {
            entries,
            fixations: Vec::new(),
            saccades: Vec::new(),
            blinks: Vec::new(),
            features: None,
            warnings,
        };
        for interval in intervals {
            match interval.kind {
                IntervalKind::Fixation => trial.fixations.push(interval),
                IntervalKind::Saccade => trial.saccades.push(interval),
                IntervalKind::Blink => trial.blinks.push(interval),
            }
        }
        trial.set_features();
        Ok(trial)
    }

    /// Takes the payload of the first TrialFeatures entry; later ones are ignored.
    fn set_features(&mut self) {
        self.features = self.entries.iter().find_map(|e| match e {
            Entry::TrialFeatures { features, .. } => Some(features.clone()),
            _ => None,
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn fixations(&self) -> &[Interval] {
        &self.fixations
    }

    pub fn saccades(&self) -> &[Interval] {
        &self.saccades
    }

    pub fn blinks(&self) -> &[Interval] {
        &self.blinks
    }

    pub fn intervals(&self, kind: IntervalKind) -> &[Interval] {
        match kind {
            IntervalKind::Fixation => &self.fixations,
            IntervalKind::Saccade => &self.saccades,
            IntervalKind::Blink => &self.blinks,
        }
    }

    pub fn features(&self) -> Option<&Features> {
        self.features.as_ref()
    }

    pub fn feature(&self, key: &str) -> Option<&str> {
        self.features.as_ref()?.get(key).map(String::as_str)
    }

    /// True when the feature keys are exactly `expected`: missing and extra
    /// keys both fail.
    pub fn has_exact_features<'a>(&self, expected: impl IntoIterator<Item = &'a str>) -> bool {
        let Some(features) = &self.features else {
            return false;
        };
        let expected: BTreeSet<&str> = expected.into_iter().collect();
        let actual: BTreeSet<&str> = features.keys().map(String::as_str).collect();
        expected == actual
    }

    pub fn warnings(&self) -> &[TrialWarning] {
        &self.warnings
    }

    pub fn trial_number(&self) -> u32 {
        match &self.entries[0] {
            Entry::StartTrial { trial_number, .. } => *trial_number,
            _ => unreachable!("trial framing is checked on construction"),
        }
    }

    pub fn stimulus_id(&self) -> &str {
        match &self.entries[0] {
            Entry::StartTrial { stimulus_id, .. } => stimulus_id,
            _ => unreachable!("trial framing is checked on construction"),
        }
    }

    pub fn start_time(&self) -> u64 {
        self.entries[0].time()
    }

    pub fn stop_time(&self) -> u64 {
        self.entries[self.entries.len() - 1].time()
    }

    pub fn duration(&self) -> u64 {
        self.stop_time().saturating_sub(self.start_time())
    }

    /// Time of the first Response entry relative to trial start.
    pub fn response_time(&self) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| matches!(e, Entry::Response { .. }))
            .map(|e| e.time().saturating_sub(self.start_time()))
    }
}
