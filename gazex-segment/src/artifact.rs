use crate::blink::is_candidate;
use crate::config::SegmentationConfig;
use crate::sample::{Sample, velocity};

/// Replaces samples whose velocity against the last good sample is
/// physiologically impossible, along with lost-signal samples too short to be
/// a blink. Runs of artifacts are interpolated linearly once a good sample
/// arrives again; runs before the first good sample and after the last one
/// hold its position. Returns the number of samples replaced.
pub fn remove_artifacts(segment: &mut [Sample], config: &SegmentationConfig) -> usize {
    let screen = &config.screen;
    let max = config.max_velocity_deg_s;
    let lost = |s: &Sample| is_candidate(s, config.blink_threshold_px);

    // The anchor is the first sample carrying signal whose step to the next
    // sample is plausible.
    let Some(first_good) = (0..segment.len()).find(|&i| {
        !lost(&segment[i])
            && segment
                .get(i + 1)
                .is_none_or(|next| velocity(&segment[i], next, screen) <= max)
    }) else {
        return 0;
    };
    let anchor = segment[first_good].point;
    for s in &mut segment[..first_good] {
        *s = Sample::synthetic(s.time, anchor);
    }
    let mut replaced = first_good;

    let mut last_good = first_good;
    for i in first_good + 1..segment.len() {
        if lost(&segment[i]) || velocity(&segment[last_good], &segment[i], screen) > max {
            replaced += 1;
            continue;
        }
        if i > last_good + 1 {
            bridge(segment, last_good, i);
        }
        last_good = i;
    }

    let anchor = segment[last_good].point;
    for s in &mut segment[last_good + 1..] {
        *s = Sample::synthetic(s.time, anchor);
    }
    replaced
}

fn bridge(segment: &mut [Sample], from: usize, to: usize) {
    let (a, b) = (segment[from], segment[to]);
    let span = (b.time - a.time) as f64;
    for s in &mut segment[from + 1..to] {
        let t = (s.time - a.time) as f64 / span;
        *s = Sample::synthetic(s.time, a.point.lerp(&b.point, t));
    }
}
