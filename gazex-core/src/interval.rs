use crate::entry::{Boundary, Entry};
use crate::error::IntervalError;
use crate::region::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Fixation,
    Saccade,
    Blink,
}

impl IntervalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixation => "fixation",
            Self::Saccade => "saccade",
            Self::Blink => "blink",
        }
    }

    /// Blink timestamps come from the lid detector and may jump backwards.
    pub fn requires_monotonic_time(&self) -> bool {
        !matches!(self, Self::Blink)
    }
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed index range `[begin, end]` into the entry sequence of the trial
/// that owns it. `entries[begin]` and `entries[end]` are the start and end
/// markers of `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub kind: IntervalKind,
    pub begin: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(
        kind: IntervalKind,
        begin: usize,
        end: usize,
        entries: &[Entry],
    ) -> Result<Self, IntervalError> {
        let interval = Interval { kind, begin, end };
        interval.validate(entries)?;
        Ok(interval)
    }

    pub fn validate(&self, entries: &[Entry]) -> Result<(), IntervalError> {
        let Interval { kind, begin, end } = *self;
        if end <= begin {
            return Err(IntervalError::Empty { kind, begin, end });
        }
        let framed = entries.get(begin).and_then(Entry::interval_marker)
            == Some((kind, Boundary::Start))
            && entries.get(end).and_then(Entry::interval_marker) == Some((kind, Boundary::End));
        if !framed {
            return Err(IntervalError::Unframed { kind, begin, end });
        }
        if kind.requires_monotonic_time() {
            // Synthetic boundary markers share the timestamp of their
            // neighbouring sample, so equal times are allowed.
            for index in begin + 1..=end {
                if entries[index].time() < entries[index - 1].time() {
                    return Err(IntervalError::NonMonotonic { kind, index });
                }
            }
        }
        Ok(())
    }

    pub fn start_time(&self, entries: &[Entry]) -> u64 {
        entries[self.begin].time()
    }

    pub fn end_time(&self, entries: &[Entry]) -> u64 {
        entries[self.end].time()
    }

    pub fn duration(&self, entries: &[Entry]) -> u64 {
        self.end_time(entries)
            .saturating_sub(self.start_time(entries))
    }

    pub fn entries<'a>(&self, entries: &'a [Entry]) -> &'a [Entry] {
        &entries[self.begin..=self.end]
    }

    pub fn positions<'a>(self, entries: &'a [Entry]) -> impl Iterator<Item = Point> + 'a {
        self.entries(entries).iter().filter_map(Entry::position)
    }

    pub fn first_position(&self, entries: &[Entry]) -> Option<Point> {
        self.positions(entries).next()
    }

    pub fn last_position(&self, entries: &[Entry]) -> Option<Point> {
        self.positions(entries).last()
    }

    /// Mean gaze position, `None` when the interval holds no samples.
    pub fn centroid(&self, entries: &[Entry]) -> Option<Point> {
        let (sum, count) = self
            .positions(entries)
            .fold((Point::default(), 0usize), |(acc, n), p| {
                (Point::new(acc.x + p.x, acc.y + p.y), n + 1)
            });
        (count > 0).then(|| Point::new(sum.x / count as f64, sum.y / count as f64))
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixation_entries() -> Vec<Entry> {
        vec![
            Entry::StartFixation { time: 100 },
            Entry::Position {
                time: 100,
                x: 10.0,
                y: 20.0,
            },
            Entry::Position {
                time: 102,
                x: 12.0,
                y: 22.0,
            },
            Entry::Position {
                time: 104,
                x: 14.0,
                y: 24.0,
            },
            Entry::EndFixation { time: 104 },
        ]
    }

    #[test]
    fn derives_duration_positions_and_centroid() {
        let entries = fixation_entries();
        let fix = Interval::new(IntervalKind::Fixation, 0, 4, &entries).unwrap();
        assert_eq!(fix.duration(&entries), 4);
        assert_eq!(fix.first_position(&entries), Some(Point::new(10.0, 20.0)));
        assert_eq!(fix.last_position(&entries), Some(Point::new(14.0, 24.0)));
        assert_eq!(fix.centroid(&entries), Some(Point::new(12.0, 22.0)));
        assert_eq!(fix.entries(&entries).len(), 5);
    }

    #[test]
    fn rejects_wrong_markers() {
        let entries = fixation_entries();
        let err = Interval::new(IntervalKind::Saccade, 0, 4, &entries).unwrap_err();
        assert!(matches!(err, IntervalError::Unframed { .. }));
        let err = Interval::new(IntervalKind::Fixation, 4, 4, &entries).unwrap_err();
        assert!(matches!(err, IntervalError::Empty { .. }));
    }

    #[test]
    fn fixations_must_not_go_back_in_time() {
        let mut entries = fixation_entries();
        entries[2] = Entry::Position {
            time: 90,
            x: 0.0,
            y: 0.0,
        };
        let err = Interval::new(IntervalKind::Fixation, 0, 4, &entries).unwrap_err();
        assert_eq!(
            err,
            IntervalError::NonMonotonic {
                kind: IntervalKind::Fixation,
                index: 2
            }
        );
    }

    #[test]
    fn blinks_tolerate_unordered_timestamps() {
        let entries = vec![
            Entry::StartBlink { time: 500 },
            Entry::Position {
                time: 480,
                x: 0.0,
                y: 0.0,
            },
            Entry::EndBlink { time: 560 },
        ];
        let blink = Interval::new(IntervalKind::Blink, 0, 2, &entries).unwrap();
        assert_eq!(blink.duration(&entries), 60);
    }

    #[test]
    fn centroid_is_none_without_samples() {
        let entries = vec![Entry::StartSaccade { time: 1 }, Entry::EndSaccade { time: 5 }];
        let sac = Interval::new(IntervalKind::Saccade, 0, 1, &entries).unwrap();
        assert_eq!(sac.centroid(&entries), None);
    }
}
