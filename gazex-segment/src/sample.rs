use crate::config::ScreenGeometry;
use gazex_core::{Entry, Point};
use serde::{Deserialize, Serialize};

/// Gaze sample as delivered by the device, time in native clock units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub time: u64,
    pub x: f64,
    pub y: f64,
}

impl RawSample {
    pub fn new(time: u64, x: f64, y: f64) -> Self {
        Self { time, x, y }
    }
}

/// One trial of raw samples plus the device markers recorded alongside them
/// (trial start/stop, responses, trial features), all in native clock units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrial {
    pub samples: Vec<RawSample>,
    pub markers: Vec<Entry>,
}

/// Millisecond sample. `synthetic` marks positions the engine made up
/// (interpolated or held) rather than measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: u64,
    pub point: Point,
    pub synthetic: bool,
}

impl Sample {
    pub fn new(time: u64, x: f64, y: f64) -> Self {
        Self {
            time,
            point: Point::new(x, y),
            synthetic: false,
        }
    }

    pub fn synthetic(time: u64, point: Point) -> Self {
        Self {
            time,
            point,
            synthetic: true,
        }
    }

    pub fn to_entry(&self) -> Entry {
        Entry::Position {
            time: self.time,
            x: self.point.x,
            y: self.point.y,
        }
    }
}

/// Angular velocity between two samples in degrees per second.
pub fn velocity(a: &Sample, b: &Sample, screen: &ScreenGeometry) -> f64 {
    let deg = screen.px_to_deg(a.point.distance(&b.point));
    let dt_ms = b.time.abs_diff(a.time);
    if dt_ms == 0 {
        return if deg == 0.0 { 0.0 } else { f64::INFINITY };
    }
    deg * 1000.0 / dt_ms as f64
}
