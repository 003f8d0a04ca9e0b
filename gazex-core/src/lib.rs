pub mod entry;
pub mod error;
pub mod interval;
pub mod region;
pub mod trial;

pub use entry::{Boundary, Entry, Features, parse_coordinate, parse_time};
pub use error::{EntryError, IntervalError, TrialError};
pub use interval::{Interval, IntervalKind};
pub use region::{Point, Region, RegionSet, Shape};
pub use trial::{Trial, TrialWarning};
