//! Domain primitives for drift tracking.

use serde::{Deserialize, Serialize};

use crate::common::error::{GuardError, GuardResult};

/// Score distribution captured at model-fitting time.
///
/// Always non-empty and finite; checked on construction so a bad artefact
/// fails at startup instead of inside `current_psi`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ReferenceDistribution {
    values: Vec<f64>,
}

impl ReferenceDistribution {
    pub fn new(values: Vec<f64>) -> GuardResult<Self> {
        if values.is_empty() {
            return Err(GuardError::config("reference distribution is empty"));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(GuardError::config(format!(
                "reference distribution has a non-finite value at index {pos}"
            )));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ascending copy used for percentile breakpoints.
    pub fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }
}

impl TryFrom<Vec<f64>> for ReferenceDistribution {
    type Error = GuardError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        ReferenceDistribution::new(values)
    }
}

impl From<ReferenceDistribution> for Vec<f64> {
    fn from(value: ReferenceDistribution) -> Self {
        value.values
    }
}

/// Point-in-time view of the monitor.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DriftStats {
    /// Neutral 0 while `ready` is false.
    pub psi: f64,
    pub observations: usize,
    pub reference_len: Option<usize>,
    /// Enough observations and a reference were present to compute PSI.
    pub ready: bool,
}

/// Repository contract for the persisted reference distribution.
pub trait ReferenceRepo {
    fn put_reference(&self, reference: &ReferenceDistribution) -> GuardResult<()>;
    fn get_reference(&self) -> GuardResult<ReferenceDistribution>;
}
