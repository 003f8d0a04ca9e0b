use gazex_core::{Entry, Region, RegionSet, Trial};
use serde::{Serialize, Serializer};
use tracing::{debug, trace};

/// Consecutive fixations of one trial that landed in the same region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionFixation<'r> {
    #[serde(serialize_with = "region_name")]
    pub region: &'r Region,
    /// Entry index of the first fixation's StartFixation
    pub begin_entry: usize,
    /// Entry index of the last fixation's EndFixation
    pub end_entry: usize,
    pub total_time_ms: u64,
    pub is_target: bool,
}

fn region_name<S: Serializer>(region: &&Region, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&region.name)
}

struct Dwell<'r> {
    region: &'r Region,
    begin: usize,
    end: usize,
}

impl<'r> Dwell<'r> {
    fn close(self, entries: &[Entry], target: &str, out: &mut Vec<RegionFixation<'r>>) {
        let total_time_ms = entries[self.end]
            .time()
            .saturating_sub(entries[self.begin].time());
        if total_time_ms == 0 {
            debug!("Dropping zero-length dwell in {}", self.region.name);
            return;
        }
        out.push(RegionFixation {
            region: self.region,
            begin_entry: self.begin,
            end_entry: self.end,
            total_time_ms,
            is_target: self.region.name == target,
        });
    }
}

/// Walks the trial's fixations in order and merges runs that map to the same
/// region. A region change or a blink in between closes the current run.
/// Fixations outside every region (after the tolerance fallback) are
/// skipped without closing it.
pub fn aggregate_fixations<'r>(
    trial: &Trial,
    regions: &'r RegionSet,
    target: &str,
) -> Vec<RegionFixation<'r>> {
    let entries = trial.entries();
    let blinks = trial.blinks();
    let mut next_blink = 0;
    let mut current: Option<Dwell<'r>> = None;
    let mut out = Vec::new();

    for fixation in trial.fixations() {
        let mut blinked = false;
        while blinks.get(next_blink).is_some_and(|b| b.begin < fixation.begin) {
            next_blink += 1;
            blinked = true;
        }
        if blinked {
            if let Some(dwell) = current.take() {
                dwell.close(entries, target, &mut out);
            }
        }

        let Some(region) = fixation
            .centroid(entries)
            .and_then(|c| regions.locate(&c))
        else {
            trace!("Fixation at entry {} is outside every region", fixation.begin);
            continue;
        };

        match current.as_mut() {
            Some(dwell) if std::ptr::eq(dwell.region, region) => dwell.end = fixation.end,
            _ => {
                let next = Dwell {
                    region,
                    begin: fixation.begin,
                    end: fixation.end,
                };
                if let Some(dwell) = current.replace(next) {
                    dwell.close(entries, target, &mut out);
                }
            }
        }
    }
    if let Some(dwell) = current {
        dwell.close(entries, target, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazex_core::{Point, Shape};
    use gazex_trial::parse_trial;

    fn rect(name: &str, cx: f64, cy: f64, hw: f64, hh: f64) -> Region {
        Region::new(
            name,
            Shape::Rectangle {
                center: Point::new(cx, cy),
                half_width: hw,
                half_height: hh,
            },
        )
    }

    enum Event {
        Fix(u64, u64, f64, f64),
        Blink(u64, u64),
    }

    fn trial(events: &[Event]) -> Trial {
        let mut entries = vec![Entry::StartTrial {
            time: 0,
            trial_number: 1,
            stimulus_id: "scene".into(),
        }];
        for event in events {
            match *event {
                Event::Fix(from, to, x, y) => {
                    entries.push(Entry::StartFixation { time: from });
                    entries.extend((from..=to).map(|time| Entry::Position { time, x, y }));
                    entries.push(Entry::EndFixation { time: to });
                }
                Event::Blink(from, to) => {
                    entries.push(Entry::StartBlink { time: from });
                    entries.push(Entry::EndBlink { time: to });
                }
            }
        }
        let stop = entries.last().map_or(0, Entry::time) + 1;
        entries.push(Entry::StopTrial { time: stop });
        parse_trial(&mut entries.into_iter().peekable()).unwrap()
    }

    fn regions() -> RegionSet {
        RegionSet::new(vec![
            rect("left", 100.0, 100.0, 50.0, 50.0),
            rect("right", 175.0, 100.0, 25.0, 50.0),
        ])
    }

    #[test]
    fn border_goes_to_first_region_not_nearest() {
        let regions = regions();
        let t = trial(&[Event::Fix(10, 60, 150.0, 100.0)]);
        let dwells = aggregate_fixations(&t, &regions, "right");
        assert_eq!(dwells.len(), 1);
        assert_eq!(dwells[0].region.name, "left");
        assert!(!dwells[0].is_target);
    }

    #[test]
    fn same_region_fixations_merge() {
        let regions = regions();
        let t = trial(&[
            Event::Fix(0, 40, 90.0, 90.0),
            Event::Fix(60, 100, 110.0, 95.0),
            Event::Fix(120, 200, 180.0, 100.0),
        ]);
        let dwells = aggregate_fixations(&t, &regions, "right");
        assert_eq!(dwells.len(), 2);
        assert_eq!(dwells[0].region.name, "left");
        assert_eq!(dwells[0].total_time_ms, 100);
        assert_eq!(dwells[1].total_time_ms, 80);
        assert!(dwells[1].is_target);
        assert!(t.entries()[dwells[1].begin_entry].interval_marker().is_some());
    }

    #[test]
    fn blink_splits_a_dwell() {
        let regions = regions();
        let t = trial(&[
            Event::Fix(0, 40, 90.0, 90.0),
            Event::Blink(50, 90),
            Event::Fix(100, 140, 90.0, 90.0),
        ]);
        let dwells = aggregate_fixations(&t, &regions, "left");
        let spans: Vec<u64> = dwells.iter().map(|d| d.total_time_ms).collect();
        assert_eq!(spans, vec![40, 40]);
    }

    #[test]
    fn unmapped_fixation_does_not_split() {
        let regions = regions();
        let t = trial(&[
            Event::Fix(0, 40, 90.0, 90.0),
            Event::Fix(50, 80, 900.0, 900.0),
            Event::Fix(90, 120, 95.0, 90.0),
        ]);
        let dwells = aggregate_fixations(&t, &regions, "left");
        assert_eq!(dwells.len(), 1);
        assert_eq!(dwells[0].total_time_ms, 120);
    }

    #[test]
    fn near_miss_uses_tolerance_and_zero_dwell_is_dropped() {
        let regions = regions();
        // Just above "left": 55 px from its center, tolerance is ~70.9 px.
        let t = trial(&[Event::Fix(0, 30, 100.0, 45.0), Event::Fix(40, 40, 180.0, 100.0)]);
        let dwells = aggregate_fixations(&t, &regions, "left");
        assert_eq!(dwells.len(), 1);
        assert_eq!(dwells[0].region.name, "left");
        assert_eq!(dwells[0].total_time_ms, 30);
    }

    #[test]
    fn serializes_region_by_name() {
        let regions = regions();
        let t = trial(&[Event::Fix(0, 30, 175.0, 100.0)]);
        let dwells = aggregate_fixations(&t, &regions, "right");
        let json = serde_json::to_value(&dwells).unwrap();
        assert_eq!(json[0]["region"], "right");
        assert_eq!(json[0]["is_target"], true);
    }
}
