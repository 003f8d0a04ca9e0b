use crate::error::EntryError;
use crate::interval::IntervalKind;
use crate::region::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trial variables attached by the experiment software (condition, target side, ...).
pub type Features = BTreeMap<String, String>;

/// One timestamped occurrence in a recording. Times are whole milliseconds
/// relative to the recording clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Position {
        time: u64,
        x: f64,
        y: f64,
    },
    StartFixation {
        time: u64,
    },
    EndFixation {
        time: u64,
    },
    StartSaccade {
        time: u64,
    },
    EndSaccade {
        time: u64,
    },
    StartBlink {
        time: u64,
    },
    EndBlink {
        time: u64,
    },
    Response {
        time: u64,
    },
    TrialFeatures {
        time: u64,
        features: Features,
    },
    StartTrial {
        time: u64,
        trial_number: u32,
        stimulus_id: String,
    },
    StopTrial {
        time: u64,
    },
}

/// Which side of an interval a marker entry sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl Entry {
    pub fn time(&self) -> u64 {
        match self {
            Entry::Position { time, .. }
            | Entry::StartFixation { time }
            | Entry::EndFixation { time }
            | Entry::StartSaccade { time }
            | Entry::EndSaccade { time }
            | Entry::StartBlink { time }
            | Entry::EndBlink { time }
            | Entry::Response { time }
            | Entry::TrialFeatures { time, .. }
            | Entry::StartTrial { time, .. }
            | Entry::StopTrial { time } => *time,
        }
    }

    /// Same entry, moved to `time`.
    pub fn with_time(mut self, new_time: u64) -> Self {
        match &mut self {
            Entry::Position { time, .. }
            | Entry::StartFixation { time }
            | Entry::EndFixation { time }
            | Entry::StartSaccade { time }
            | Entry::EndSaccade { time }
            | Entry::StartBlink { time }
            | Entry::EndBlink { time }
            | Entry::Response { time }
            | Entry::TrialFeatures { time, .. }
            | Entry::StartTrial { time, .. }
            | Entry::StopTrial { time } => *time = new_time,
        }
        self
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            Entry::Position { x, y, .. } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }

    pub fn is_position(&self) -> bool {
        matches!(self, Entry::Position { .. })
    }

    pub fn is_trial_start(&self) -> bool {
        matches!(self, Entry::StartTrial { .. })
    }

    pub fn is_trial_stop(&self) -> bool {
        matches!(self, Entry::StopTrial { .. })
    }

    /// Interval kind and side for Start*/End* markers.
    pub fn interval_marker(&self) -> Option<(IntervalKind, Boundary)> {
        Some(match self {
            Entry::StartFixation { .. } => (IntervalKind::Fixation, Boundary::Start),
            Entry::EndFixation { .. } => (IntervalKind::Fixation, Boundary::End),
            Entry::StartSaccade { .. } => (IntervalKind::Saccade, Boundary::Start),
            Entry::EndSaccade { .. } => (IntervalKind::Saccade, Boundary::End),
            Entry::StartBlink { .. } => (IntervalKind::Blink, Boundary::Start),
            Entry::EndBlink { .. } => (IntervalKind::Blink, Boundary::End),
            _ => return None,
        })
    }

    /// Builds the start or end marker of an interval kind.
    pub fn marker(kind: IntervalKind, boundary: Boundary, time: u64) -> Self {
        match (kind, boundary) {
            (IntervalKind::Fixation, Boundary::Start) => Entry::StartFixation { time },
            (IntervalKind::Fixation, Boundary::End) => Entry::EndFixation { time },
            (IntervalKind::Saccade, Boundary::Start) => Entry::StartSaccade { time },
            (IntervalKind::Saccade, Boundary::End) => Entry::EndSaccade { time },
            (IntervalKind::Blink, Boundary::Start) => Entry::StartBlink { time },
            (IntervalKind::Blink, Boundary::End) => Entry::EndBlink { time },
        }
    }

    /// Validates field ranges. Device adapters produce entries from free text,
    /// so coordinates and identifiers are not trusted.
    pub fn check(&self) -> Result<(), EntryError> {
        match self {
            Entry::Position { time, x, y } => {
                if !x.is_finite() || !y.is_finite() {
                    return Err(EntryError::malformed(format!(
                        "position at {time} ms has non-finite coordinates ({x}, {y})"
                    )));
                }
            }
            Entry::StartTrial {
                time, stimulus_id, ..
            } => {
                if stimulus_id.trim().is_empty() {
                    return Err(EntryError::malformed(format!(
                        "trial start at {time} ms has no stimulus id"
                    )));
                }
            }
            Entry::TrialFeatures { time, features } => {
                if features.keys().any(|k| k.trim().is_empty()) {
                    return Err(EntryError::malformed(format!(
                        "trial features at {time} ms contain an empty key"
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parses a raw timestamp field. Timestamps must be non-negative integers.
pub fn parse_time(field: &str) -> Result<u64, EntryError> {
    field
        .parse::<u64>()
        .map_err(|_| EntryError::malformed(format!("time field {field:?} is not a non-negative integer")))
}

/// Parses a raw coordinate field; `.` is the tracker's placeholder for a lost sample.
pub fn parse_coordinate(field: &str) -> Result<f64, EntryError> {
    if field == "." {
        return Ok(0.0);
    }
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(EntryError::malformed(format!(
            "coordinate field {field:?} is not a finite number"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_accessor_covers_every_variant() {
        let entries = vec![
            Entry::Position {
                time: 1,
                x: 0.0,
                y: 0.0,
            },
            Entry::StartFixation { time: 2 },
            Entry::EndBlink { time: 3 },
            Entry::TrialFeatures {
                time: 4,
                features: Features::new(),
            },
            Entry::StartTrial {
                time: 5,
                trial_number: 1,
                stimulus_id: "face_01".into(),
            },
        ];
        let times: Vec<u64> = entries.iter().map(Entry::time).collect();
        assert_eq!(times, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn with_time_keeps_payload() {
        let e = Entry::StartTrial {
            time: 1000,
            trial_number: 7,
            stimulus_id: "house".into(),
        }
        .with_time(1);
        assert_eq!(
            e,
            Entry::StartTrial {
                time: 1,
                trial_number: 7,
                stimulus_id: "house".into()
            }
        );
    }

    #[test]
    fn check_rejects_non_finite_positions() {
        let e = Entry::Position {
            time: 10,
            x: f64::NAN,
            y: 3.0,
        };
        assert!(matches!(e.check(), Err(EntryError::Malformed { .. })));

        let ok = Entry::Position {
            time: 10,
            x: 1.0,
            y: 3.0,
        };
        assert!(ok.check().is_ok());
    }

    #[test]
    fn check_rejects_blank_stimulus() {
        let e = Entry::StartTrial {
            time: 0,
            trial_number: 1,
            stimulus_id: "  ".into(),
        };
        assert!(e.check().is_err());
    }

    #[test]
    fn parse_time_requires_integers() {
        assert_eq!(parse_time("1532"), Ok(1532));
        assert!(parse_time("15.5").is_err());
        assert!(parse_time("-2").is_err());
        assert!(parse_time("abc").is_err());
    }

    #[test]
    fn parse_coordinate_maps_lost_samples_to_origin() {
        assert_eq!(parse_coordinate("."), Ok(0.0));
        assert_eq!(parse_coordinate("512.3"), Ok(512.3));
        assert!(parse_coordinate("inf").is_err());
    }

    #[test]
    fn markers_round_trip_through_interval_marker() {
        for kind in [IntervalKind::Fixation, IntervalKind::Saccade, IntervalKind::Blink] {
            for side in [Boundary::Start, Boundary::End] {
                let e = Entry::marker(kind, side, 42);
                assert_eq!(e.interval_marker(), Some((kind, side)));
                assert_eq!(e.time(), 42);
            }
        }
        assert_eq!(Entry::Response { time: 0 }.interval_marker(), None);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_string(&Entry::StopTrial { time: 9 }).unwrap();
        assert_eq!(json, r#"{"kind":"stop_trial","time":9}"#);
    }
}
