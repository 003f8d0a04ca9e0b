use crate::interval::IntervalKind;

/// A single entry whose fields violate their type or range rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntryError {
    #[error("malformed entry: {reason}")]
    Malformed { reason: String },
}

impl EntryError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        EntryError::Malformed {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntervalError {
    #[error("{kind} interval [{begin}, {end}] does not span any entries")]
    Empty {
        kind: IntervalKind,
        begin: usize,
        end: usize,
    },
    #[error("{kind} interval [{begin}, {end}] is not framed by its start/end markers")]
    Unframed {
        kind: IntervalKind,
        begin: usize,
        end: usize,
    },
    #[error("{kind} interval goes back in time at entry {index}")]
    NonMonotonic { kind: IntervalKind, index: usize },
}

/// Structural failures of a trial. Both variants are recoverable: the subject
/// loop skips the trial and resumes at the next StartTrial.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrialError {
    #[error("entry stream ended before StopTrial (trial {trial_number:?}, {entries} entries read)")]
    Incomplete {
        trial_number: Option<u32>,
        entries: usize,
    },
    #[error("malformed trial {trial_number:?}: {reason}")]
    Malformed {
        trial_number: Option<u32>,
        reason: String,
    },
}

impl TrialError {
    pub fn trial_number(&self) -> Option<u32> {
        match self {
            TrialError::Incomplete { trial_number, .. } => *trial_number,
            TrialError::Malformed { trial_number, .. } => *trial_number,
        }
    }
}
