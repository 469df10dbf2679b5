//! Analysis settings (analysis.json).
//!
//! JSON shape, every field optional:
//! {
//!   "smoothing": { "window": 19, "order": 2 },
//!   "double_failure_threshold": 24,
//!   "coordinator_instances": 1,
//!   "grouping": { "protocol_segment": 2, "interval_segment": 3, "interval_prefix": 2 }
//! }
//!
//! Segment indices are 0-based positions in the dash-separated run name, so
//! `job-1-cc-30s-50k-x` groups as protocol `cc`, interval `30`.

use crate::Result;
use crate::series::SavitzkyGolay;

use anyhow::{Context, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub smoothing: RawSmoothing,
    pub double_failure_threshold: usize,
    pub coordinator_instances: usize,
    pub grouping: GroupingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawSmoothing {
    pub window: usize,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub protocol_segment: usize,
    pub interval_segment: usize,
    pub interval_prefix: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            smoothing: RawSmoothing::default(),
            double_failure_threshold: 24,
            coordinator_instances: 1,
            grouping: GroupingConfig::default(),
        }
    }
}

impl Default for RawSmoothing {
    fn default() -> Self {
        Self {
            window: 19,
            order: 2,
        }
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            protocol_segment: 2,
            interval_segment: 3,
            interval_prefix: 2,
        }
    }
}

/// Validated settings handed to the pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub smoother: SavitzkyGolay,
    pub double_failure_threshold: usize,
    pub coordinator_instances: usize,
    pub grouping: GroupingConfig,
}

impl RawConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
    }

    pub fn validate_and_build(self) -> Result<AnalysisConfig> {
        let smoother = SavitzkyGolay::new(self.smoothing.window, self.smoothing.order)
            .context("invalid smoothing settings")?;

        if self.grouping.interval_prefix == 0 {
            bail!("grouping.interval_prefix must be at least 1");
        }
        if self.grouping.protocol_segment == self.grouping.interval_segment {
            bail!(
                "grouping uses segment {} for both protocol and interval",
                self.grouping.protocol_segment
            );
        }

        Ok(AnalysisConfig {
            smoother,
            double_failure_threshold: self.double_failure_threshold,
            coordinator_instances: self.coordinator_instances,
            grouping: self.grouping,
        })
    }
}

impl AnalysisConfig {
    /// Load from `path`, or use the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let raw = match path {
            Some(p) => RawConfig::from_file(p)?,
            None => RawConfig::default(),
        };
        raw.validate_and_build()
    }
}
