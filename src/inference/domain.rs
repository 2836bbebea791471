//! Domain definitions for scoring live records and the decision payload.

use serde::Serialize;

use crate::common::error::GuardResult;
use crate::data::domain::Record;

/// External classifier producing the positive-class probability.
pub trait Scorer: Send + Sync {
    fn score(&self, record: &Record) -> GuardResult<f64>;
}

impl<F> Scorer for F
where
    F: Fn(&Record) -> GuardResult<f64> + Send + Sync,
{
    fn score(&self, record: &Record) -> GuardResult<f64> {
        self(record)
    }
}

/// Recommended action for one customer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Call,
    NoCall,
}

impl Decision {
    /// `Call` when the probability reaches the operating threshold.
    pub fn from_threshold(probability: f64, threshold: f64) -> Self {
        if probability >= threshold {
            Decision::Call
        } else {
            Decision::NoCall
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Call => "CALL",
            Decision::NoCall => "NO_CALL",
        }
    }
}

/// Drift and latency figures attached to every prediction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Monitoring {
    pub psi: f64,
    pub psi_alert: bool,
    pub latency_ms: f64,
}

/// Result of a single decision call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub prediction: Decision,
    /// Rounded to four decimals for display; the decision uses the raw value.
    pub probability: f64,
    pub decision_threshold: f64,
    pub monitoring: Monitoring,
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
