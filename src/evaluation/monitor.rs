//! Live score window and on-demand PSI against the fitted reference.
//!
//! The serving boundary owns one `DriftMonitor` (usually behind an `Arc`)
//! for the lifetime of the process. A single mutex serialises "append and
//! evict" with the full PSI computation, so readers never see a torn window.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::common::config::MonitorCfg;
use crate::common::error::{GuardError, GuardResult};

use super::domain::{DriftStats, ReferenceDistribution};
use super::service::ReferenceProfile;

#[derive(Debug)]
pub struct DriftMonitor {
    cfg: MonitorCfg,
    window: Mutex<VecDeque<f64>>,
    reference: OnceLock<ReferenceProfile>,
}

impl DriftMonitor {
    /// Monitor with default tuning and the given window capacity.
    pub fn new(capacity: usize) -> GuardResult<Self> {
        Self::with_config(MonitorCfg {
            window_capacity: capacity,
            ..MonitorCfg::default()
        })
    }

    pub fn with_config(cfg: MonitorCfg) -> GuardResult<Self> {
        if cfg.window_capacity == 0 {
            return Err(GuardError::config("window capacity must be positive"));
        }
        if cfg.min_observations > cfg.window_capacity {
            return Err(GuardError::config(format!(
                "window capacity {} is below the minimum of {} observations",
                cfg.window_capacity, cfg.min_observations
            )));
        }
        if cfg.bins == 0 {
            return Err(GuardError::config("bin count must be positive"));
        }
        if !(cfg.smoothing_floor > 0.0 && cfg.smoothing_floor < 1.0) {
            return Err(GuardError::config("smoothing floor must be within (0, 1)"));
        }
        Ok(Self {
            window: Mutex::new(VecDeque::with_capacity(cfg.window_capacity)),
            reference: OnceLock::new(),
            cfg,
        })
    }

    /// Install the reference distribution. Allowed once per monitor.
    pub fn set_reference(&self, reference: &ReferenceDistribution) -> GuardResult<()> {
        let profile = ReferenceProfile::new(reference, self.cfg.bins);
        let bins = profile.binning().bin_count();
        self.reference
            .set(profile)
            .map_err(|_| GuardError::ReferenceAlreadySet)?;
        tracing::info!(
            reference_len = reference.len(),
            bins,
            "drift reference installed"
        );
        Ok(())
    }

    pub fn has_reference(&self) -> bool {
        self.reference.get().is_some()
    }

    /// Record one live score, evicting the oldest beyond capacity.
    pub fn observe(&self, probability: f64) {
        if !probability.is_finite() {
            tracing::warn!(probability, "ignoring non-finite score");
            return;
        }
        let mut window = self.lock_window();
        window.push_back(probability);
        while window.len() > self.cfg.window_capacity {
            window.pop_front();
        }
    }

    /// PSI of the window against the reference; neutral 0 until ready.
    pub fn current_psi(&self) -> f64 {
        self.stats().psi
    }

    pub fn stats(&self) -> DriftStats {
        let window = self.lock_window();
        let observations = window.len();
        let profile = self.reference.get();
        let reference_len = profile.map(ReferenceProfile::len);

        let profile = match profile {
            Some(p) if observations >= self.cfg.min_observations => p,
            _ => {
                return DriftStats {
                    psi: 0.0,
                    observations,
                    reference_len,
                    ready: false,
                }
            }
        };

        let psi = profile.psi(window.iter(), self.cfg.smoothing_floor);
        tracing::trace!(psi, observations, "psi computed");
        DriftStats {
            psi,
            observations,
            reference_len,
            ready: true,
        }
    }

    /// Copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.lock_window().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_window().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cfg.window_capacity
    }

    pub fn config(&self) -> &MonitorCfg {
        &self.cfg
    }

    // The window is valid after every push/pop, so a poisoned lock is safe to reuse.
    fn lock_window(&self) -> MutexGuard<'_, VecDeque<f64>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DriftMonitor {
    fn default() -> Self {
        let cfg = MonitorCfg::default();
        Self {
            window: Mutex::new(VecDeque::with_capacity(cfg.window_capacity)),
            reference: OnceLock::new(),
            cfg,
        }
    }
}
