use crate::state::parse_trial;
use gazex_core::{Entry, Trial, TrialError};
use serde::Serialize;
use std::iter::Peekable;
use tracing::{info, warn};

/// Iterates the trials of one subject's entry stream. Failed trials are
/// yielded as errors and parsing resumes at the next StartTrial.
pub struct TrialParser<I: Iterator<Item = Entry>> {
    stream: Peekable<I>,
}

impl<I: Iterator<Item = Entry>> TrialParser<I> {
    pub fn new(stream: impl IntoIterator<Item = Entry, IntoIter = I>) -> Self {
        Self {
            stream: stream.into_iter().peekable(),
        }
    }

    /// Unconsumed remainder of the stream.
    pub fn into_remaining(self) -> Peekable<I> {
        self.stream
    }
}

impl<I: Iterator<Item = Entry>> Iterator for TrialParser<I> {
    type Item = Result<Trial, TrialError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.peek()?;
        match parse_trial(&mut self.stream) {
            // Only entries outside any trial were left.
            Err(TrialError::Incomplete {
                trial_number: None,
                ..
            }) => None,
            result => Some(result),
        }
    }
}

/// Diagnostic for a trial that could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTrial {
    pub trial_number: Option<u32>,
    pub reason: String,
}

impl From<&TrialError> for SkippedTrial {
    fn from(err: &TrialError) -> Self {
        Self {
            trial_number: err.trial_number(),
            reason: err.to_string(),
        }
    }
}

/// Parsed trials of one subject together with the ones that were skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubjectTrials {
    pub trials: Vec<Trial>,
    pub skipped: Vec<SkippedTrial>,
}

impl SubjectTrials {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Parses every trial in a subject's entry stream. A bad trial never aborts
/// the remaining ones.
pub fn parse_subject(entries: impl IntoIterator<Item = Entry>) -> SubjectTrials {
    let mut subject = SubjectTrials::default();
    for result in TrialParser::new(entries) {
        match result {
            Ok(trial) => subject.trials.push(trial),
            Err(e) => {
                warn!("Skipping trial: {}", e);
                subject.skipped.push(SkippedTrial::from(&e));
            }
        }
    }
    info!(
        "Parsed {} trials, skipped {}",
        subject.trials.len(),
        subject.skipped_count()
    );
    subject
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_noise_ends_iteration() {
        let entries = vec![
            Entry::StartTrial {
                time: 0,
                trial_number: 1,
                stimulus_id: "a".into(),
            },
            Entry::StopTrial { time: 5 },
            Entry::Response { time: 6 },
        ];
        let mut parser = TrialParser::new(entries);
        assert!(parser.next().unwrap().is_ok());
        assert!(parser.next().is_none());
    }

    #[test]
    fn empty_stream_has_no_trials() {
        let subject = parse_subject(Vec::new());
        assert!(subject.trials.is_empty());
        assert_eq!(subject.skipped_count(), 0);
    }
}
