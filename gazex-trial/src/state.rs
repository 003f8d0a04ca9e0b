use gazex_core::{Boundary, Entry, Interval, IntervalKind, Trial, TrialError, TrialWarning};
use std::iter::Peekable;
use tracing::{debug, warn};

/// Trial parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    AwaitingStart,
    InTrial,
    Closed,
}

impl ParserState {
    pub fn next(&self) -> Option<Self> {
        use ParserState::*;
        Some(match self {
            AwaitingStart => InTrial,
            InTrial => Closed,
            Closed => return None,
        })
    }

    pub fn accepts_entries(&self) -> bool {
        matches!(self, Self::InTrial)
    }
}

/// Accumulates one trial's entries and intervals. At most one interval per
/// kind is open at a time; kinds may overlap each other.
#[derive(Debug, Default)]
pub struct TrialBuilder {
    state: ParserState,
    entries: Vec<Entry>,
    open: [Option<usize>; 3],
    intervals: Vec<Interval>,
    warnings: Vec<TrialWarning>,
    discarded: usize,
}

fn slot(kind: IntervalKind) -> usize {
    match kind {
        IntervalKind::Fixation => 0,
        IntervalKind::Saccade => 1,
        IntervalKind::Blink => 2,
    }
}

const KINDS: [IntervalKind; 3] = [
    IntervalKind::Fixation,
    IntervalKind::Saccade,
    IntervalKind::Blink,
];

impl TrialBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn trial_number(&self) -> Option<u32> {
        match self.entries.first() {
            Some(Entry::StartTrial { trial_number, .. }) => Some(*trial_number),
            _ => None,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries thrown away while waiting for StartTrial.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Feeds one entry through the state machine.
    pub fn handle_entry(&mut self, entry: Entry) {
        match self.state {
            ParserState::AwaitingStart => {
                if !entry.is_trial_start() {
                    self.discarded += 1;
                    return;
                }
                if let Err(e) = entry.check() {
                    warn!("Dropping trial start: {}", e);
                    self.discarded += 1;
                    return;
                }
                self.entries.push(entry);
                self.advance();
            }
            ParserState::InTrial => self.append(entry),
            ParserState::Closed => {
                debug!("Entry at {} ms arrived after StopTrial", entry.time());
            }
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            self.state = next;
        }
    }

    fn append(&mut self, entry: Entry) {
        if let Err(e) = entry.check() {
            warn!("Dropping entry in trial {:?}: {}", self.trial_number(), e);
            self.warnings.push(TrialWarning::MalformedEntry {
                reason: e.to_string(),
            });
            return;
        }

        let index = self.entries.len();
        let marker = entry.interval_marker();
        let stop = entry.is_trial_stop();
        self.entries.push(entry);

        match marker {
            Some((kind, Boundary::Start)) => {
                if let Some(begin) = self.open[slot(kind)].replace(index) {
                    self.unresolved(kind, begin);
                }
            }
            Some((kind, Boundary::End)) => match self.open[slot(kind)].take() {
                Some(begin) => match Interval::new(kind, begin, index, &self.entries) {
                    Ok(interval) => self.intervals.push(interval),
                    Err(e) => {
                        warn!("Discarding interval in trial {:?}: {}", self.trial_number(), e);
                        self.warnings.push(e.into());
                    }
                },
                None => {
                    debug!("Unmatched {} end at entry {}", kind, index);
                    self.warnings
                        .push(TrialWarning::UnmatchedEnd { interval: kind, index });
                }
            },
            None if stop => {
                for kind in KINDS {
                    if let Some(begin) = self.open[slot(kind)].take() {
                        self.unresolved(kind, begin);
                    }
                }
                self.advance();
            }
            None => {}
        }
    }

    fn unresolved(&mut self, kind: IntervalKind, begin: usize) {
        warn!(
            "Unresolved {} interval opened at entry {} in trial {:?}",
            kind,
            begin,
            self.trial_number()
        );
        self.warnings.push(TrialWarning::UnresolvedInterval {
            interval: kind,
            begin,
        });
    }

    /// Builds the trial once StopTrial has been seen.
    pub fn finish(self) -> Result<Trial, TrialError> {
        if self.state != ParserState::Closed {
            return Err(TrialError::Incomplete {
                trial_number: self.trial_number(),
                entries: self.entries.len(),
            });
        }
        Trial::from_parts(self.entries, self.intervals, self.warnings)
    }
}

/// Parses the next trial from `stream`. Entries before the first StartTrial
/// are discarded; entries after its StopTrial stay in the stream. A second
/// StartTrial before StopTrial fails the current trial and is left in the
/// stream so the next call starts there.
pub fn parse_trial<I>(stream: &mut Peekable<I>) -> Result<Trial, TrialError>
where
    I: Iterator<Item = Entry>,
{
    let mut builder = TrialBuilder::new();
    loop {
        match builder.state {
            ParserState::AwaitingStart => match stream.next() {
                Some(entry) => builder.handle_entry(entry),
                None => {
                    return Err(TrialError::Incomplete {
                        trial_number: None,
                        entries: 0,
                    });
                }
            },
            ParserState::InTrial => match stream.next_if(|e| !e.is_trial_start()) {
                Some(entry) => builder.handle_entry(entry),
                None if stream.peek().is_some() => {
                    return Err(TrialError::Malformed {
                        trial_number: builder.trial_number(),
                        reason: "StartTrial found before StopTrial".into(),
                    });
                }
                None => {
                    return Err(TrialError::Incomplete {
                        trial_number: builder.trial_number(),
                        entries: builder.entry_count(),
                    });
                }
            },
            ParserState::Closed => {
                if builder.discarded() > 0 {
                    debug!(
                        "Discarded {} entries before trial {:?}",
                        builder.discarded(),
                        builder.trial_number()
                    );
                }
                return builder.finish();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(time: u64, n: u32) -> Entry {
        Entry::StartTrial {
            time,
            trial_number: n,
            stimulus_id: format!("stim_{n}"),
        }
    }

    fn pos(time: u64) -> Entry {
        Entry::Position {
            time,
            x: 400.0,
            y: 300.0,
        }
    }

    #[test]
    fn state_sequence() {
        assert_eq!(ParserState::AwaitingStart.next(), Some(ParserState::InTrial));
        assert_eq!(ParserState::InTrial.next(), Some(ParserState::Closed));
        assert_eq!(ParserState::Closed.next(), None);
        assert!(ParserState::InTrial.accepts_entries());
    }

    #[test]
    fn leading_entries_are_discarded_and_tail_is_kept() {
        let entries = vec![
            pos(1),
            Entry::Response { time: 2 },
            start(10, 1),
            pos(11),
            Entry::StopTrial { time: 12 },
            pos(13),
            start(20, 2),
        ];
        let mut stream = entries.into_iter().peekable();
        let trial = parse_trial(&mut stream).unwrap();
        assert_eq!(trial.entries().len(), 3);
        assert_eq!(trial.trial_number(), 1);
        assert_eq!(stream.next(), Some(pos(13)));
        assert_eq!(stream.next(), Some(start(20, 2)));
    }

    #[test]
    fn builds_nested_intervals() {
        let entries = vec![
            start(0, 1),
            Entry::StartFixation { time: 1 },
            pos(1),
            pos(2),
            Entry::EndFixation { time: 2 },
            Entry::StartSaccade { time: 3 },
            Entry::StartBlink { time: 4 },
            pos(4),
            Entry::EndSaccade { time: 5 },
            Entry::EndBlink { time: 9 },
            Entry::StopTrial { time: 10 },
        ];
        let trial = parse_trial(&mut entries.into_iter().peekable()).unwrap();
        assert_eq!(trial.fixations(), &[Interval {
            kind: IntervalKind::Fixation,
            begin: 1,
            end: 4
        }]);
        assert_eq!(trial.saccades()[0].begin, 5);
        assert_eq!(trial.saccades()[0].end, 8);
        assert_eq!(trial.blinks()[0].begin, 6);
        assert_eq!(trial.blinks()[0].end, 9);
        assert!(trial.warnings().is_empty());
    }

    #[test]
    fn unresolved_saccade_is_dropped_with_warning() {
        let entries = vec![
            start(0, 4),
            Entry::StartFixation { time: 1 },
            pos(1),
            Entry::EndFixation { time: 1 },
            Entry::StartSaccade { time: 2 },
            pos(3),
            Entry::StopTrial { time: 4 },
        ];
        let trial = parse_trial(&mut entries.into_iter().peekable()).unwrap();
        assert!(trial.saccades().is_empty());
        assert_eq!(trial.fixations().len(), 1);
        assert_eq!(
            trial.warnings(),
            &[TrialWarning::UnresolvedInterval {
                interval: IntervalKind::Saccade,
                begin: 4
            }]
        );
    }

    #[test]
    fn stream_ending_mid_trial_is_incomplete() {
        let entries = vec![start(0, 7), pos(1), pos(2)];
        let err = parse_trial(&mut entries.into_iter().peekable()).unwrap_err();
        assert_eq!(
            err,
            TrialError::Incomplete {
                trial_number: Some(7),
                entries: 3
            }
        );
    }

    #[test]
    fn nested_start_fails_trial_without_consuming_it() {
        let entries = vec![start(0, 1), pos(1), start(5, 2), Entry::StopTrial { time: 6 }];
        let mut stream = entries.into_iter().peekable();
        let err = parse_trial(&mut stream).unwrap_err();
        assert!(matches!(err, TrialError::Malformed { trial_number: Some(1), .. }));
        let next = parse_trial(&mut stream).unwrap();
        assert_eq!(next.trial_number(), 2);
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let entries = vec![
            start(0, 1),
            Entry::Position {
                time: 1,
                x: f64::INFINITY,
                y: 0.0,
            },
            pos(2),
            Entry::StopTrial { time: 3 },
        ];
        let trial = parse_trial(&mut entries.into_iter().peekable()).unwrap();
        assert_eq!(trial.entries().len(), 3);
        assert!(matches!(trial.warnings()[0], TrialWarning::MalformedEntry { .. }));
    }

    #[test]
    fn backwards_fixation_is_discarded() {
        let entries = vec![
            start(0, 1),
            Entry::StartFixation { time: 10 },
            pos(5),
            Entry::EndFixation { time: 12 },
            Entry::StopTrial { time: 13 },
        ];
        let trial = parse_trial(&mut entries.into_iter().peekable()).unwrap();
        assert!(trial.fixations().is_empty());
        assert!(matches!(trial.warnings()[0], TrialWarning::InvalidInterval { .. }));
    }

    #[test]
    fn end_without_start_is_reported() {
        let entries = vec![start(0, 1), Entry::EndBlink { time: 1 }, Entry::StopTrial { time: 2 }];
        let trial = parse_trial(&mut entries.into_iter().peekable()).unwrap();
        assert_eq!(
            trial.warnings(),
            &[TrialWarning::UnmatchedEnd {
                interval: IntervalKind::Blink,
                index: 1
            }]
        );
    }
}
