// lib.rs - cohort assignment, score drift and threshold selection core
pub mod common;
pub mod data;
pub mod training;
pub mod inference;
pub mod evaluation;
pub mod api;

pub use common::{GuardCode, GuardError, GuardResult};
pub use data::{assign, identify, Cohort, ControlPct, PseudoId, Record};
pub use evaluation::{DriftMonitor, ReferenceDistribution};
pub use training::{optimize, OptimizationResult, ScoredLabel};
