//! Inference domain: the serving boundary around the external classifier.

pub mod domain;
pub mod service;

pub use domain::{Decision, Prediction, Scorer};
pub use service::DecisionService;
