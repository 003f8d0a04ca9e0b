//! Command-line interface

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Gazex - turn gaze-tracker recordings into per-trial fixation reports
#[derive(Parser, Debug)]
#[command(name = "gazex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Recordings to process, one subject per file
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Experiment config (screen, thresholds, regions)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Line format of the recordings
    #[arg(short, long, value_enum, default_value_t = Format::Native)]
    pub format: Format,

    /// Target region name, overrides the config
    #[arg(short, long)]
    pub target: Option<String>,

    /// Directory for one JSON report per subject (stdout when absent)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Tracker-detected fixation, saccade and blink events with ms samples
    Native,
    /// Bare samples to run through the segmentation engine
    Raw,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
