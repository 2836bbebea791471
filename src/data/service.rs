//! Deterministic pseudo-identification and cohort assignment.
//!
//! Assignment depends only on a hash of the record, so it can be recomputed
//! on any machine at any time and a record never changes cohort.

use crate::common::error::{GuardError, GuardResult};

use super::domain::{Cohort, ControlPct, IdentityScheme, PseudoId, Record};

/// Hash the record's stable attributes with the default scheme.
pub fn identify(record: &Record) -> PseudoId {
    IdentityScheme::default().identify(record)
}

/// Map an identifier onto a cohort: `(last two hex chars) % 100 < pct`.
pub fn assign(pseudo_id: &PseudoId, control_pct: ControlPct) -> Cohort {
    let bucket = pseudo_id.suffix_value() % 100;
    if bucket < control_pct.get() {
        Cohort::Control
    } else {
        Cohort::Train
    }
}

/// A record together with its identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Assigned {
    pub pseudo_id: PseudoId,
    pub record: Record,
}

/// Records partitioned by cohort, input order preserved within each side.
#[derive(Clone, Debug, Default)]
pub struct CohortSplit {
    pub train: Vec<Assigned>,
    pub control: Vec<Assigned>,
}

impl CohortSplit {
    pub fn len(&self) -> usize {
        self.train.len() + self.control.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identify and assign every record, as done before fitting a model.
pub fn split<I>(records: I, control_pct: ControlPct) -> CohortSplit
where
    I: IntoIterator<Item = Record>,
{
    let scheme = IdentityScheme::default();
    let mut out = CohortSplit::default();
    for record in records {
        let pseudo_id = scheme.identify(&record);
        let side = match assign(&pseudo_id, control_pct) {
            Cohort::Control => &mut out.control,
            Cohort::Train => &mut out.train,
        };
        side.push(Assigned { pseudo_id, record });
    }
    tracing::info!(
        train = out.train.len(),
        control = out.control.len(),
        control_pct = control_pct.get(),
        "records split into cohorts"
    );
    out
}

/// Share of positive outcomes, e.g. the control cohort's baseline conversion.
pub fn conversion_rate(labels: &[bool]) -> GuardResult<f64> {
    if labels.is_empty() {
        return Err(GuardError::invalid("conversion rate of an empty cohort"));
    }
    let positives = labels.iter().filter(|&&y| y).count();
    Ok(positives as f64 / labels.len() as f64)
}
