use crate::algorithm::SegmentationError;
use crate::blink::BlinkSpan;
use crate::fixation::FixationSpan;
use crate::saccade::SaccadeSpan;
use crate::sample::Sample;
use gazex_core::{Boundary, Entry, IntervalKind};
use tracing::{debug, warn};

/// Renders corrected samples with their blink, fixation and saccade markers.
/// Original samples covered by a synthetic saccade are replaced by its path.
pub fn assemble_body(
    samples: &[Sample],
    blinks: &[BlinkSpan],
    fixations: &[FixationSpan],
    saccades: &[SaccadeSpan],
) -> Vec<Entry> {
    use Boundary::{End, Start};
    use IntervalKind::{Blink, Fixation, Saccade};

    let extra = 2 * (blinks.len() + fixations.len())
        + saccades.iter().map(|s| s.path.len() + 2).sum::<usize>();
    let mut body = Vec::with_capacity(samples.len() + extra);
    let (mut b, mut f, mut s) = (0, 0, 0);
    let mut replaced: Option<(u64, u64)> = None;

    for (i, sample) in samples.iter().enumerate() {
        if let Some((t0, t1)) = replaced {
            if sample.time >= t1 {
                replaced = None;
            } else if sample.time > t0 {
                continue;
            }
        }
        let t = sample.time;
        let blink = blinks.get(b);
        let fixation = fixations.get(f);

        if blink.is_some_and(|x| x.first == i) {
            body.push(Entry::marker(Blink, Start, t));
        }
        if fixation.is_some_and(|x| x.first == i) {
            body.push(Entry::marker(Fixation, Start, t));
        }
        body.push(sample.to_entry());
        if fixation.is_some_and(|x| x.last == i) {
            body.push(Entry::marker(Fixation, End, t));
            f += 1;
        }
        if blink.is_some_and(|x| x.last == i) {
            body.push(Entry::marker(Blink, End, t));
            b += 1;
        }
        if let Some(saccade) = saccades.get(s).filter(|x| x.after == i) {
            body.push(Entry::marker(Saccade, Start, saccade.start));
            body.extend(saccade.path.iter().map(Sample::to_entry));
            body.push(Entry::marker(Saccade, End, saccade.end));
            replaced = Some((saccade.start, saccade.end));
            s += 1;
        }
    }
    body
}

/// Re-inserts the device messages into the body. Each message goes right
/// before the first body entry at or after its time, in recorded order.
/// The trial is framed by the recorded StartTrial and StopTrial, moved
/// outwards when samples fall outside them; a missing StopTrial is
/// synthesized at the last sample.
pub fn splice_markers(body: Vec<Entry>, markers: Vec<Entry>) -> Result<Vec<Entry>, SegmentationError> {
    let mut start = None;
    let mut stop = None;
    let mut messages = Vec::with_capacity(markers.len());
    for marker in markers {
        match marker {
            Entry::StartTrial { .. } if start.is_none() => start = Some(marker),
            Entry::StopTrial { .. } if stop.is_none() => stop = Some(marker),
            Entry::StartTrial { .. } | Entry::StopTrial { .. } => {
                warn!("Ignoring repeated trial boundary at {} ms", marker.time());
            }
            Entry::Position { .. } => {}
            m if m.interval_marker().is_some() => {
                debug!("Dropping device {:?} in favour of detected intervals", m);
            }
            m => messages.push(m),
        }
    }
    let start = start.ok_or(SegmentationError::MissingTrialStart)?;

    let first = body.first().map_or(start.time(), Entry::time);
    let last = body.last().map_or(start.time(), Entry::time);
    let start_time = start.time().min(first);
    let stop = match stop {
        Some(stop) => {
            let time = stop.time().max(last);
            stop.with_time(time)
        }
        None => {
            debug!("No StopTrial recorded, closing trial at {} ms", last);
            Entry::StopTrial {
                time: last.max(start_time),
            }
        }
    };

    let mut out = Vec::with_capacity(body.len() + messages.len() + 2);
    out.push(start.with_time(start_time));
    let mut pending = messages.into_iter().peekable();
    for entry in body {
        while let Some(message) = pending.next_if(|m| m.time() <= entry.time()) {
            out.push(message);
        }
        out.push(entry);
    }
    out.extend(pending);
    out.push(stop);
    Ok(out)
}
