//! Drift detection: live score window, quantile binning and PSI.

pub mod domain;
pub mod monitor;
pub mod repo_fs;
pub mod service;

pub use domain::{DriftStats, ReferenceDistribution, ReferenceRepo};
pub use monitor::DriftMonitor;
pub use service::{population_stability_index, psi_alert};
