//! Filesystem repository for the operating threshold.
//!
//! The threshold is a single number written as plain text, readable by any
//! serving process without a shared binary format.

use std::fs;
use std::path::PathBuf;

use crate::common::config::AppCfg;
use crate::common::error::{GuardError, GuardResult};

use super::domain::ThresholdRepo;

pub const THRESHOLD_FILE: &str = "threshold.txt";

/// Persist the threshold under `cfg.models_dir()`.
pub struct FsThresholdRepo {
    root: PathBuf,
}

impl FsThresholdRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(cfg.models_dir())
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(THRESHOLD_FILE)
    }
}

impl ThresholdRepo for FsThresholdRepo {
    fn put_threshold(&self, threshold: f64) -> GuardResult<()> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GuardError::invalid(format!(
                "threshold must be a probability, got {threshold}"
            )));
        }
        fs::create_dir_all(&self.root).map_err(|source| GuardError::io(&self.root, source))?;
        let path = self.path();
        fs::write(&path, format!("{threshold}\n")).map_err(|source| GuardError::io(&path, source))?;
        tracing::info!(path = %path.display(), threshold, "threshold saved");
        Ok(())
    }

    fn get_threshold(&self) -> GuardResult<f64> {
        let path = self.path();
        let text = fs::read_to_string(&path).map_err(|source| GuardError::io(&path, source))?;
        let threshold: f64 = text
            .trim()
            .parse()
            .map_err(|err| GuardError::parse(&path, err))?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GuardError::parse(
                &path,
                format!("threshold {threshold} is outside [0, 1]"),
            ));
        }
        Ok(threshold)
    }
}
