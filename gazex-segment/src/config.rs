use gazex_timing::DeviceClock;
use serde::{Deserialize, Serialize};

/// Physical display setup used to convert pixels to visual degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenGeometry {
    /// Horizontal size of the visible screen area.
    pub width_cm: f64,
    /// Horizontal resolution.
    pub resolution_px: f64,
    /// Eye to screen distance.
    pub distance_cm: f64,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            width_cm: 53.0,
            resolution_px: 1920.0,
            distance_cm: 60.0,
        }
    }
}

impl ScreenGeometry {
    pub fn deg_per_pixel(&self) -> f64 {
        (0.5 * self.width_cm).atan2(self.distance_cm).to_degrees() / (0.5 * self.resolution_px)
    }

    pub fn px_to_deg(&self, px: f64) -> f64 {
        px * self.deg_per_pixel()
    }

    pub fn deg_to_px(&self, deg: f64) -> f64 {
        deg / self.deg_per_pixel()
    }
}

/// Configuration for the segmentation engine with tunable thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Unit of the device timestamps
    pub clock: DeviceClock,
    pub screen: ScreenGeometry,
    /// Sampling period; inferred from the recording when unset
    pub sample_unit_ms: Option<u64>,

    /// Both coordinates below this magnitude mean the tracker lost the eye
    pub blink_threshold_px: f64,
    pub min_blink_duration_ms: u64,
    /// Consecutive calm samples that mark where a blink really starts/ends
    pub stabilization_samples: usize,

    /// Sample-to-sample velocity above which gaze is moving
    pub min_velocity_deg_s: f64,
    /// Velocity above which a sample is a measurement artifact
    pub max_velocity_deg_s: f64,
    /// Radius around the running centroid a fixation may cover
    pub min_dispersion_deg: f64,
    pub min_fixation_duration_ms: u64,
    /// Fixation candidates spreading further than this have no usable centroid
    pub max_centroid_spread_px: f64,

    /// Carpenter (1988) main-sequence duration: slope * amplitude + intercept
    pub saccade_slope_ms_per_deg: f64,
    pub saccade_intercept_ms: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            clock: DeviceClock::default(),
            screen: ScreenGeometry::default(),
            sample_unit_ms: None,
            blink_threshold_px: 10.0,
            min_blink_duration_ms: 16,
            stabilization_samples: 8,
            min_velocity_deg_s: 40.0,
            max_velocity_deg_s: 1000.0,
            min_dispersion_deg: 1.0,
            min_fixation_duration_ms: 30,
            max_centroid_spread_px: 50.0,
            saccade_slope_ms_per_deg: 2.2,
            saccade_intercept_ms: 21.0,
        }
    }
}

impl SegmentationConfig {
    /// Consecutive lost samples needed for a blink at the given sampling period.
    pub fn min_blink_samples(&self, unit_ms: u64) -> usize {
        let unit = unit_ms.max(1);
        (self.min_blink_duration_ms.div_ceil(unit)).max(1) as usize
    }

    pub fn dispersion_px(&self) -> f64 {
        self.screen.deg_to_px(self.min_dispersion_deg)
    }
}
