//! Filesystem repository for the reference score distribution.
//!
//! Stored as a plain JSON array of floats next to the threshold artefact.

use std::fs;
use std::path::PathBuf;

use crate::common::config::AppCfg;
use crate::common::error::{GuardError, GuardResult};

use super::domain::{ReferenceDistribution, ReferenceRepo};

pub const REFERENCE_FILE: &str = "reference_distribution.json";

pub struct FsReferenceRepo {
    root: PathBuf,
}

impl FsReferenceRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(cfg.models_dir())
    }

    /// Repository rooted at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(REFERENCE_FILE)
    }
}

impl ReferenceRepo for FsReferenceRepo {
    fn put_reference(&self, reference: &ReferenceDistribution) -> GuardResult<()> {
        fs::create_dir_all(&self.root).map_err(|source| GuardError::io(&self.root, source))?;
        let path = self.path();
        let json = serde_json::to_string(reference).map_err(|err| GuardError::parse(&path, err))?;
        fs::write(&path, json).map_err(|source| GuardError::io(&path, source))?;
        tracing::info!(path = %path.display(), len = reference.len(), "reference distribution saved");
        Ok(())
    }

    fn get_reference(&self) -> GuardResult<ReferenceDistribution> {
        let path = self.path();
        let text = fs::read_to_string(&path).map_err(|source| GuardError::io(&path, source))?;
        // Validation errors from ReferenceDistribution surface as parse errors here.
        serde_json::from_str(&text).map_err(|err| GuardError::parse(&path, err))
    }
}
