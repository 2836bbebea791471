//! Error handling primitives shared across the core.
//!
//! Hot-path operations (hashing, assignment, observing scores, PSI) never
//! return these; they surface at setup time or from offline jobs.

use std::path::PathBuf;

/// Stable error codes that cross the FFI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GuardCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Input failed validation.
    InvalidInput = 1,
    /// Configuration was rejected at setup time.
    Config = 2,
    /// The optimizer found no candidate with at least one call.
    NoUsableThreshold = 3,
    /// A persisted artefact could not be read or written.
    Io = 4,
}

/// Canonical error type for the core.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("reference distribution already set")]
    ReferenceAlreadySet,
    #[error("no usable threshold found among {candidates} candidates")]
    NoUsableThreshold { candidates: usize },
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Result alias used throughout the crate.
pub type GuardResult<T> = Result<T, GuardError>;

impl GuardError {
    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Configuration helper.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// IO helper keeping the offending path around for diagnostics.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> GuardCode {
        match self {
            GuardError::InvalidInput(_) => GuardCode::InvalidInput,
            GuardError::Config(_) | GuardError::ReferenceAlreadySet => GuardCode::Config,
            GuardError::NoUsableThreshold { .. } => GuardCode::NoUsableThreshold,
            GuardError::Io { .. } | GuardError::Parse { .. } => GuardCode::Io,
        }
    }
}
