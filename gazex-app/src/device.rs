//! Line formats of the supported trackers.
//!
//! Lines are split on whitespace and offered to a fixed list of classifiers;
//! the first one that recognises the line decides what it is. Lines nobody
//! recognises (headers, calibration output) are ignored.
//!
//! Both formats share the message vocabulary:
//!
//! ```text
//! MSG <time> TRIALID <n> <stimulus>
//! MSG <time> TRIAL_END
//! MSG <time> RESPONSE
//! MSG <time> FEATURES key=value ...
//! ```
//!
//! `native` adds `SFIX|EFIX|SSACC|ESACC|SBLINK|EBLINK <time>` events and
//! `<time> <x> <y>` samples in milliseconds. `raw` adds `<time> SMP <x> <y>`
//! samples in device clock units, which go through segmentation.

use crate::cli::Format;
use gazex_core::{Entry, EntryError, Features, parse_coordinate, parse_time};
use gazex_segment::{RawSample, RawTrial};
use tracing::{trace, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Entry(Entry),
    Sample(RawSample),
}

type Classifier = fn(&[&str]) -> Option<Result<Record, EntryError>>;

const NATIVE: &[Classifier] = &[message, event, native_sample];
const RAW: &[Classifier] = &[message, raw_sample];

fn field<'a>(fields: &[&'a str], i: usize) -> Result<&'a str, EntryError> {
    fields
        .get(i)
        .copied()
        .ok_or_else(|| EntryError::malformed(format!("missing field {i} in {:?}", fields.join(" "))))
}

fn message(fields: &[&str]) -> Option<Result<Record, EntryError>> {
    (fields.first() == Some(&"MSG")).then(|| parse_message(fields))
}

fn parse_message(fields: &[&str]) -> Result<Record, EntryError> {
    let time = parse_time(field(fields, 1)?)?;
    let entry = match field(fields, 2)? {
        "TRIALID" => {
            let n = field(fields, 3)?;
            let trial_number = n
                .parse()
                .map_err(|_| EntryError::malformed(format!("bad trial number {n:?}")))?;
            Entry::StartTrial {
                time,
                trial_number,
                stimulus_id: field(fields, 4)?.to_string(),
            }
        }
        "TRIAL_END" => Entry::StopTrial { time },
        "RESPONSE" => Entry::Response { time },
        "FEATURES" => {
            let mut features = Features::new();
            for pair in &fields[3..] {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| EntryError::malformed(format!("bad feature {pair:?}")))?;
                features.insert(key.to_string(), value.to_string());
            }
            Entry::TrialFeatures { time, features }
        }
        other => return Err(EntryError::malformed(format!("unknown message {other:?}"))),
    };
    Ok(Record::Entry(entry))
}

fn event(fields: &[&str]) -> Option<Result<Record, EntryError>> {
    let make: fn(u64) -> Entry = match *fields.first()? {
        "SFIX" => |time| Entry::StartFixation { time },
        "EFIX" => |time| Entry::EndFixation { time },
        "SSACC" => |time| Entry::StartSaccade { time },
        "ESACC" => |time| Entry::EndSaccade { time },
        "SBLINK" => |time| Entry::StartBlink { time },
        "EBLINK" => |time| Entry::EndBlink { time },
        _ => return None,
    };
    Some(field(fields, 1).and_then(parse_time).map(|t| Record::Entry(make(t))))
}

fn starts_with_digit(fields: &[&str]) -> bool {
    fields
        .first()
        .and_then(|f| f.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

fn native_sample(fields: &[&str]) -> Option<Result<Record, EntryError>> {
    (starts_with_digit(fields) && fields.len() >= 3).then(|| parse_native_sample(fields))
}

fn parse_native_sample(fields: &[&str]) -> Result<Record, EntryError> {
    Ok(Record::Entry(Entry::Position {
        time: parse_time(fields[0])?,
        x: parse_coordinate(fields[1])?,
        y: parse_coordinate(fields[2])?,
    }))
}

fn raw_sample(fields: &[&str]) -> Option<Result<Record, EntryError>> {
    (starts_with_digit(fields) && fields.get(1) == Some(&"SMP")).then(|| parse_raw_sample(fields))
}

fn parse_raw_sample(fields: &[&str]) -> Result<Record, EntryError> {
    Ok(Record::Sample(RawSample::new(
        parse_time(fields[0])?,
        parse_coordinate(field(fields, 2)?)?,
        parse_coordinate(field(fields, 3)?)?,
    )))
}

/// Classifies one line. `None` for lines no classifier claims.
pub fn classify(format: Format, line: &str) -> Option<Result<Record, EntryError>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let classifiers = match format {
        Format::Native => NATIVE,
        Format::Raw => RAW,
    };
    classifiers.iter().find_map(|classify| classify(&fields))
}

/// Every recognised record of a recording, malformed lines dropped.
pub fn records(format: Format, text: &str) -> Vec<Record> {
    text.lines()
        .enumerate()
        .filter_map(|(n, line)| match classify(format, line)? {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Line {}: {}", n + 1, e);
                None
            }
        })
        .collect()
}

/// Native recordings are already an entry stream.
pub fn native_entries(records: Vec<Record>) -> Vec<Entry> {
    records
        .into_iter()
        .filter_map(|r| match r {
            Record::Entry(e) => Some(e),
            Record::Sample(s) => {
                trace!("Ignoring raw sample at {} in native recording", s.time);
                None
            }
        })
        .collect()
}

/// Groups raw records into trials by their TRIALID / TRIAL_END messages.
/// Records outside any trial are dropped. A TRIALID while a trial is open
/// closes it without a stop marker.
pub fn raw_trials(records: Vec<Record>) -> Vec<RawTrial> {
    let mut trials = Vec::new();
    let mut current: Option<RawTrial> = None;
    let mut outside = 0usize;

    for record in records {
        match record {
            Record::Entry(e) if e.is_trial_start() => {
                if let Some(open) = current.take() {
                    warn!("Trial started before the previous one ended");
                    trials.push(open);
                }
                current = Some(RawTrial {
                    samples: Vec::new(),
                    markers: vec![e],
                });
            }
            Record::Entry(e) if e.is_trial_stop() => match current.take() {
                Some(mut open) => {
                    open.markers.push(e);
                    trials.push(open);
                }
                None => outside += 1,
            },
            Record::Entry(e) => match current.as_mut() {
                Some(open) => open.markers.push(e),
                None => outside += 1,
            },
            Record::Sample(s) => match current.as_mut() {
                Some(open) => open.samples.push(s),
                None => outside += 1,
            },
        }
    }
    trials.extend(current);
    if outside > 0 {
        trace!("{} records outside any trial", outside);
    }
    trials
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_in_both_formats() {
        for format in [Format::Native, Format::Raw] {
            assert_eq!(
                classify(format, "MSG 1200 TRIALID 3 face_03.png"),
                Some(Ok(Record::Entry(Entry::StartTrial {
                    time: 1200,
                    trial_number: 3,
                    stimulus_id: "face_03.png".into()
                })))
            );
        }
        let Some(Ok(Record::Entry(Entry::TrialFeatures { features, .. }))) =
            classify(Format::Native, "MSG 10 FEATURES side=left congruent=1")
        else {
            panic!("features not recognised");
        };
        assert_eq!(features.get("congruent").map(String::as_str), Some("1"));
    }

    #[test]
    fn native_events_and_samples() {
        assert_eq!(
            classify(Format::Native, "SBLINK 1500"),
            Some(Ok(Record::Entry(Entry::StartBlink { time: 1500 })))
        );
        assert_eq!(
            classify(Format::Native, "1501\t.\t.\t0.0"),
            Some(Ok(Record::Entry(Entry::Position {
                time: 1501,
                x: 0.0,
                y: 0.0
            })))
        );
        assert!(classify(Format::Native, "** CONVERTED FROM EDF").is_none());
        assert!(classify(Format::Native, "").is_none());
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(matches!(classify(Format::Native, "EFIX soon"), Some(Err(_))));
        assert!(matches!(classify(Format::Native, "MSG 5 TRIALID x"), Some(Err(_))));
        assert!(matches!(classify(Format::Raw, "100 SMP 1.0"), Some(Err(_))));
    }

    #[test]
    fn raw_format_ignores_native_events() {
        assert!(classify(Format::Raw, "SFIX 100").is_none());
        assert_eq!(
            classify(Format::Raw, "1000250 SMP 512.5 300"),
            Some(Ok(Record::Sample(RawSample::new(1_000_250, 512.5, 300.0))))
        );
    }

    #[test]
    fn raw_records_are_grouped_by_trial() {
        let text = "\
100 SMP 1 1
MSG 200 TRIALID 1 a
300 SMP 2 2
MSG 350 RESPONSE
MSG 400 TRIAL_END
MSG 500 TRIALID 2 b
600 SMP 3 3
MSG 700 TRIALID 3 c
";
        let trials = raw_trials(records(Format::Raw, text));
        assert_eq!(trials.len(), 3);
        assert_eq!(trials[0].samples.len(), 1);
        assert_eq!(trials[0].markers.len(), 3);
        assert_eq!(trials[1].markers.len(), 1);
        assert!(trials[2].samples.is_empty());
    }
}
