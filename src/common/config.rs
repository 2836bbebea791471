//! Runtime configuration: built-in defaults, an optional TOML file, then
//! environment overrides.
//!
//! `COHORTGUARD_CONFIG` points at the TOML file. `COHORTGUARD_DATA_ROOT`,
//! `COHORTGUARD_LOG` and `COHORTGUARD_CONTROL_PCT` override single values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::error::{GuardError, GuardResult};

pub const ENV_CONFIG: &str = "COHORTGUARD_CONFIG";
pub const ENV_DATA_ROOT: &str = "COHORTGUARD_DATA_ROOT";
pub const ENV_LOG: &str = "COHORTGUARD_LOG";
pub const ENV_CONTROL_PCT: &str = "COHORTGUARD_CONTROL_PCT";

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppCfg {
    pub data_root: PathBuf,
    /// `EnvFilter` directive string, e.g. `info` or `cohortguard=debug`.
    pub log_filter: String,
    pub assignment: AssignmentCfg,
    pub monitor: MonitorCfg,
    pub optimizer: OptimizerCfg,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AssignmentCfg {
    /// Share of buckets (0-100) routed to the control cohort.
    pub control_pct: u8,
}

/// Drift monitor tuning.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorCfg {
    pub window_capacity: usize,
    /// Below this many scores the monitor reports a neutral PSI of 0.
    pub min_observations: usize,
    pub bins: usize,
    /// Substituted for empty bin fractions before taking the logarithm.
    pub smoothing_floor: f64,
    /// Applied by the serving boundary, not by the monitor itself.
    pub alert_threshold: f64,
}

/// Business constants and candidate grid for the threshold search.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerCfg {
    pub reward_per_conversion: f64,
    pub cost_per_call: f64,
    pub grid_start: f64,
    pub grid_stop: f64,
    pub grid_points: usize,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data"),
            log_filter: "info".to_string(),
            assignment: AssignmentCfg::default(),
            monitor: MonitorCfg::default(),
            optimizer: OptimizerCfg::default(),
        }
    }
}

impl Default for AssignmentCfg {
    fn default() -> Self {
        Self { control_pct: 20 }
    }
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            window_capacity: 1000,
            min_observations: 100,
            bins: 10,
            smoothing_floor: 1e-4,
            alert_threshold: 0.25,
        }
    }
}

impl Default for OptimizerCfg {
    fn default() -> Self {
        Self {
            reward_per_conversion: 100.0,
            cost_per_call: 10.0,
            grid_start: 0.1,
            grid_stop: 0.9,
            grid_points: 9,
        }
    }
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> GuardResult<Self> {
        let mut cfg = match env::var_os(ENV_CONFIG) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> GuardResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| GuardError::io(path, source))?;
        Self::from_toml_str(&text).map_err(|err| match err {
            GuardError::Config(reason) => GuardError::parse(path, reason),
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> GuardResult<Self> {
        toml::from_str(text).map_err(|err| GuardError::config(err.to_string()))
    }

    /// Apply single-value overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> GuardResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_DATA_ROOT) {
            self.data_root = PathBuf::from(root);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(raw) = lookup(ENV_CONTROL_PCT) {
            self.assignment.control_pct = raw.trim().parse().map_err(|_| {
                GuardError::config(format!("{ENV_CONTROL_PCT} must be an integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    /// Reject values the core cannot run with.
    pub fn validate(&self) -> GuardResult<()> {
        if self.assignment.control_pct > 100 {
            return Err(GuardError::config(format!(
                "control_pct must be within 0..=100, got {}",
                self.assignment.control_pct
            )));
        }
        let m = &self.monitor;
        if m.window_capacity == 0 {
            return Err(GuardError::config("monitor.window_capacity must be positive"));
        }
        if m.min_observations > m.window_capacity {
            return Err(GuardError::config(
                "monitor.min_observations cannot exceed monitor.window_capacity",
            ));
        }
        if m.bins == 0 {
            return Err(GuardError::config("monitor.bins must be positive"));
        }
        if !(m.smoothing_floor > 0.0 && m.smoothing_floor < 1.0) {
            return Err(GuardError::config("monitor.smoothing_floor must be within (0, 1)"));
        }
        if !m.alert_threshold.is_finite() || m.alert_threshold < 0.0 {
            return Err(GuardError::config("monitor.alert_threshold must be non-negative"));
        }
        let o = &self.optimizer;
        if !o.reward_per_conversion.is_finite() || !o.cost_per_call.is_finite() {
            return Err(GuardError::config("optimizer reward and cost must be finite"));
        }
        if o.grid_points == 0 {
            return Err(GuardError::config("optimizer.grid_points must be positive"));
        }
        if !(o.grid_start.is_finite() && o.grid_stop.is_finite()) {
            return Err(GuardError::config("optimizer grid bounds must be finite"));
        }
        if o.grid_points > 1 && o.grid_start >= o.grid_stop {
            return Err(GuardError::config(
                "optimizer.grid_start must be below optimizer.grid_stop",
            ));
        }
        Ok(())
    }

    /// Directory holding persisted artefacts (threshold, reference scores).
    pub fn models_dir(&self) -> PathBuf {
        self.data_root.join("models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_policy() {
        let cfg = AppCfg::default();
        assert_eq!(cfg.assignment.control_pct, 20);
        assert_eq!(cfg.monitor.window_capacity, 1000);
        assert_eq!(cfg.monitor.min_observations, 100);
        assert_eq!(cfg.monitor.bins, 10);
        assert_eq!(cfg.optimizer.grid_points, 9);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_overlays_defaults() {
        let cfg = AppCfg::from_toml_str(
            r#"
            data_root = "/srv/cohortguard"

            [monitor]
            window_capacity = 500
            alert_threshold = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/srv/cohortguard"));
        assert_eq!(cfg.monitor.window_capacity, 500);
        assert_eq!(cfg.monitor.alert_threshold, 0.2);
        assert_eq!(cfg.monitor.bins, 10);
        assert_eq!(cfg.optimizer, OptimizerCfg::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = AppCfg::from_toml_str("[monitor]\nwindow = 10\n").unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = AppCfg::default();
        cfg.apply_overrides(|key| match key {
            ENV_DATA_ROOT => Some("/tmp/cg".to_string()),
            ENV_CONTROL_PCT => Some(" 35 ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/tmp/cg"));
        assert_eq!(cfg.assignment.control_pct, 35);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn bad_control_pct_fails_fast() {
        let mut cfg = AppCfg::default();
        let err = cfg
            .apply_overrides(|key| (key == ENV_CONTROL_PCT).then(|| "twenty".to_string()))
            .unwrap_err();
        assert!(matches!(err, GuardError::Config(_)));

        cfg.assignment.control_pct = 101;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn monitor_bounds_are_checked() {
        let mut cfg = AppCfg::default();
        cfg.monitor.min_observations = 2000;
        assert!(cfg.validate().is_err());

        let mut cfg = AppCfg::default();
        cfg.monitor.bins = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohortguard.toml");
        fs::write(&path, "control_pct = [").unwrap();
        let err = AppCfg::from_file(&path).unwrap_err();
        assert!(matches!(err, GuardError::Parse { .. }));
    }
}
