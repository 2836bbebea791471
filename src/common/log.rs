//! Structured logging setup emitting JSON lines on stdout.
//!
//! Library code only uses `tracing` macros; the embedding process calls
//! [`init`] once. Later calls are no-ops.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::common::error::{GuardError, GuardResult};

static INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber with the given `EnvFilter` directives.
pub fn init(filter: &str) -> GuardResult<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(filter)
        .map_err(|err| GuardError::config(format!("invalid log filter '{filter}': {err}")))?;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_current_span(false)
        .try_init()
        .map_err(|err| GuardError::config(format!("failed to install subscriber: {err}")))?;
    let _ = INIT.set(());

    tracing::debug!(filter, "logging initialised");
    Ok(())
}
