//! Domain types for the operating-threshold search.

use serde::{Deserialize, Serialize};

use crate::common::config::OptimizerCfg;
use crate::common::error::{GuardError, GuardResult};

/// Threshold used before any optimisation result is available.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// One validation row: predicted probability and observed outcome.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub probability: f64,
    pub converted: bool,
}

impl ScoredLabel {
    pub fn new(probability: f64, converted: bool) -> Self {
        Self {
            probability,
            converted,
        }
    }
}

impl From<(f64, u8)> for ScoredLabel {
    fn from((probability, label): (f64, u8)) -> Self {
        Self::new(probability, label != 0)
    }
}

/// Business constants of the profit function.
///
/// Missed conversions and correct rejections carry no value on purpose.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Economics {
    /// Earned for every call that converts.
    pub reward_per_conversion: f64,
    /// Paid for every call, whatever the outcome.
    pub cost_per_call: f64,
}

impl Economics {
    pub fn new(reward_per_conversion: f64, cost_per_call: f64) -> GuardResult<Self> {
        if !reward_per_conversion.is_finite() || !cost_per_call.is_finite() {
            return Err(GuardError::config("reward and cost must be finite"));
        }
        Ok(Self {
            reward_per_conversion,
            cost_per_call,
        })
    }

    pub fn profit(&self, true_positives: usize, calls: usize) -> f64 {
        true_positives as f64 * self.reward_per_conversion - calls as f64 * self.cost_per_call
    }
}

impl From<&OptimizerCfg> for Economics {
    fn from(cfg: &OptimizerCfg) -> Self {
        Self {
            reward_per_conversion: cfg.reward_per_conversion,
            cost_per_call: cfg.cost_per_call,
        }
    }
}

/// Winning candidate of the grid search.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub threshold: f64,
    pub profit: f64,
    pub calls: usize,
    pub true_positives: usize,
}

/// Repository contract for the persisted operating threshold.
pub trait ThresholdRepo {
    fn put_threshold(&self, threshold: f64) -> GuardResult<()>;
    fn get_threshold(&self) -> GuardResult<f64>;
}
