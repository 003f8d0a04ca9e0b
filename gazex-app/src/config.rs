//! Experiment configuration loaded from TOML

use anyhow::{Context, Result, bail};
use gazex_core::RegionSet;
use gazex_segment::{ScreenGeometry, SegmentationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Region whose dwells are flagged as on-target
    pub target: Option<String>,
    pub screen: ScreenGeometry,
    pub segmentation: SegmentationConfig,
    pub regions: RegionSet,
}

impl ExperimentConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("invalid experiment config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.screen;
        if s.width_cm <= 0.0 || s.distance_cm <= 0.0 || s.resolution_px <= 0.0 {
            bail!("screen dimensions must be positive, got {:?}", s);
        }
        let seg = &self.segmentation;
        if seg.min_velocity_deg_s >= seg.max_velocity_deg_s {
            bail!(
                "min_velocity_deg_s ({}) must be below max_velocity_deg_s ({})",
                seg.min_velocity_deg_s,
                seg.max_velocity_deg_s
            );
        }
        if seg.min_dispersion_deg <= 0.0 {
            bail!("min_dispersion_deg must be > 0");
        }
        if let Some(target) = &self.target {
            if self.regions.get(target).is_none() {
                bail!("target region {:?} is not defined", target);
            }
        }
        Ok(())
    }

    /// Segmentation thresholds with the experiment's screen geometry applied.
    pub fn segmentation(&self) -> SegmentationConfig {
        SegmentationConfig {
            screen: self.screen,
            ..self.segmentation.clone()
        }
    }
}
