pub mod state;
pub mod subject;
pub use state::{ParserState, TrialBuilder, parse_trial};
pub use subject::{SkippedTrial, SubjectTrials, TrialParser, parse_subject};
