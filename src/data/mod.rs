//! Data domain: records, pseudo-identifiers and cohort assignment.

pub mod domain;
pub mod service;

pub use domain::{AttrValue, Cohort, ControlPct, IdentityScheme, PseudoId, Record};
pub use service::{assign, identify, split, CohortSplit};
