//! Dwell records of a trial's fixations over named regions of interest.

pub mod aggregate;

pub use aggregate::{RegionFixation, aggregate_fixations};
