use crate::cli::{Cli, Format};
use crate::config::ExperimentConfig;
use crate::device;
use crate::report::{QualityKey, SubjectReport};
use anyhow::{Context, Result, anyhow, bail};
use gazex_core::Entry;
use gazex_segment::segment;
use gazex_trial::{SkippedTrial, parse_subject};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{error, info, warn};

pub struct App {
    cli: Cli,
    config: ExperimentConfig,
    target: Option<String>,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => ExperimentConfig::load(path)?,
            None => ExperimentConfig::default(),
        };
        let target = cli.target.clone().or_else(|| config.target.clone());
        if let Some(name) = &target {
            if config.regions.get(name).is_none() {
                warn!("Target region {:?} is not among the configured regions", name);
            }
        }
        Ok(Self {
            cli,
            config,
            target,
        })
    }

    /// Processes every input on its own worker thread. Subjects share only
    /// the read-only configuration.
    pub fn run(self) -> Result<()> {
        info!(
            "Processing {} recording(s) as {:?} with {} region(s)",
            self.cli.inputs.len(),
            self.cli.format,
            self.config.regions.len()
        );
        if let Some(dir) = &self.cli.output {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        let app = &self;
        let results: Vec<(PathBuf, Result<String>)> = thread::scope(|scope| {
            let workers: Vec<_> = app
                .cli
                .inputs
                .iter()
                .map(|path| (path, scope.spawn(move || app.process_file(path))))
                .collect();
            workers
                .into_iter()
                .map(|(path, worker)| {
                    let result = worker
                        .join()
                        .unwrap_or_else(|_| Err(anyhow!("worker panicked")));
                    (path.clone(), result)
                })
                .collect()
        });

        let total = results.len();
        let mut failed = 0;
        for (path, result) in results {
            match result {
                Ok(json) => self.emit(&path, &json)?,
                Err(e) => {
                    error!("{}: {:#}", path.display(), e);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            bail!("{} of {} recordings failed", failed, total);
        }
        Ok(())
    }

    fn process_file(&self, path: &Path) -> Result<String> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let subject = subject_name(path);
        process_recording(
            &subject,
            &text,
            self.cli.format,
            &self.config,
            self.target.as_deref(),
        )
    }

    fn emit(&self, path: &Path, json: &str) -> Result<()> {
        match &self.cli.output {
            Some(dir) => {
                let out = dir.join(format!("{}.json", subject_name(path)));
                fs::write(&out, json).with_context(|| format!("writing {}", out.display()))?;
                info!("Wrote {}", out.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

fn subject_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Adds the trials segmentation rejected to the ones the parser skipped,
/// listed by trial number. Equal numbers keep their recorded order.
fn merge_skipped(skipped: &mut Vec<SkippedTrial>, rejected: Vec<SkippedTrial>) {
    if rejected.is_empty() {
        return;
    }
    skipped.extend(rejected);
    skipped.sort_by_key(|s| s.trial_number);
}

/// Segmented trials are told apart by number and start time, so a repeated
/// TRIALID keeps its own quality record.
fn quality_key(start: &Entry) -> Option<QualityKey> {
    match start {
        Entry::StartTrial {
            time, trial_number, ..
        } => Some((*trial_number, *time)),
        _ => None,
    }
}

/// Runs one subject's recording through the pipeline and renders the JSON
/// report. Bad trials are reported as skipped, never fatal.
pub fn process_recording(
    subject: &str,
    text: &str,
    format: Format,
    config: &ExperimentConfig,
    target: Option<&str>,
) -> Result<String> {
    let records = device::records(format, text);
    let mut quality = BTreeMap::new();
    let mut rejected = Vec::new();

    let entries = match format {
        Format::Native => device::native_entries(records),
        Format::Raw => {
            let seg = config.segmentation();
            let mut stream = Vec::new();
            for raw in device::raw_trials(records) {
                let trial_number = raw.markers.first().and_then(|m| match m {
                    Entry::StartTrial { trial_number, .. } => Some(*trial_number),
                    _ => None,
                });
                match segment(&raw, &seg) {
                    Ok(out) => {
                        if let Some(key) = out.entries.first().and_then(quality_key) {
                            quality.insert(key, out.quality);
                        }
                        stream.extend(out.entries);
                    }
                    Err(e) => {
                        warn!("Skipping trial {:?} of {}: {}", trial_number, subject, e);
                        rejected.push(SkippedTrial {
                            trial_number,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            stream
        }
    };

    let mut parsed = parse_subject(entries);
    merge_skipped(&mut parsed.skipped, rejected);
    info!(
        "{}: {} trials, {} skipped",
        subject,
        parsed.trials.len(),
        parsed.skipped_count()
    );

    let report = SubjectReport::new(
        subject,
        &parsed,
        &quality,
        &config.regions,
        target.unwrap_or_default(),
    );
    Ok(serde_json::to_string_pretty(&report)?)
}
