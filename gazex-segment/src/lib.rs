//! Signal correction and segmentation for trackers that only report raw
//! gaze samples. [`segment`] turns one trial's samples and device markers
//! into an entry stream with blink, fixation and saccade markers that the
//! trial parser can consume.

pub mod algorithm;
pub mod artifact;
pub mod blink;
pub mod config;
pub mod fixation;
pub mod normalize;
pub mod saccade;
pub mod sample;
pub mod splice;

pub use algorithm::{DataQuality, SegmentationError, SegmentedTrial, segment};
pub use config::{ScreenGeometry, SegmentationConfig};
pub use sample::{RawSample, RawTrial, Sample};
