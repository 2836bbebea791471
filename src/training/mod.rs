//! Training-time helpers: operating threshold search and its artefact.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{Economics, OptimizationResult, ScoredLabel, ThresholdRepo, DEFAULT_THRESHOLD};
pub use service::{fit_threshold, optimize, threshold_grid};
