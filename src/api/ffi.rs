//! C-compatible API for host-language serving layers.
//!
//! Strings returned by this module are owned by Rust and must be released
//! with `cohortguard_free_str`. Monitor handles must be released with
//! `cohortguard_monitor_free`. Status codes are `GuardCode` values.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::slice;

use crate::common::config::AppCfg;
use crate::common::error::{GuardCode, GuardError, GuardResult};
use crate::common::log;
use crate::data::domain::{ControlPct, PseudoId, Record};
use crate::data::service as data_service;
use crate::data::Cohort;
use crate::evaluation::domain::ReferenceDistribution;
use crate::evaluation::monitor::DriftMonitor;
use crate::training::domain::{Economics, ScoredLabel};
use crate::training::service as training_service;

/// ABI version to coordinate with the host layer.
#[no_mangle]
pub extern "C" fn cohortguard_api_version() -> u32 {
    1
}

/// Load configuration from the environment and install logging.
#[no_mangle]
pub extern "C" fn cohortguard_init() -> u32 {
    let result = AppCfg::load().and_then(|cfg| {
        log::init(&cfg.log_filter)?;
        tracing::info!(
            data_root = %cfg.data_root.display(),
            control_pct = cfg.assignment.control_pct,
            "cohortguard initialised"
        );
        Ok(())
    });
    match result {
        Ok(()) => GuardCode::Ok as u32,
        Err(err) => {
            eprintln!("cohortguard_init failed: {err}");
            err.code() as u32
        }
    }
}

/// Pseudo-identify a JSON object record; returns the hex digest or null.
#[no_mangle]
pub extern "C" fn cohortguard_identify(record_json: *const c_char) -> *const c_char {
    let Some(raw) = read_str(record_json) else {
        return std::ptr::null();
    };
    match serde_json::from_str::<Record>(&raw) {
        Ok(record) => string_to_raw(data_service::identify(&record).to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "identify: record is not a JSON object of attributes");
            std::ptr::null()
        }
    }
}

/// Returns 0 for control, 1 for train, or the negated error code.
#[no_mangle]
pub extern "C" fn cohortguard_assign(pseudo_id: *const c_char, control_pct: u32) -> i32 {
    let assigned = read_str(pseudo_id)
        .ok_or_else(|| GuardError::invalid("null pseudo id"))
        .and_then(PseudoId::parse)
        .and_then(|id| {
            let pct = u8::try_from(control_pct)
                .map_err(|_| GuardError::config("control percentage out of range"))
                .and_then(ControlPct::new)?;
            Ok(data_service::assign(&id, pct))
        });
    match assigned {
        Ok(Cohort::Control) => 0,
        Ok(Cohort::Train) => 1,
        Err(err) => -(err.code() as i32),
    }
}

/// Allocate a monitor with default tuning; null when the capacity is rejected.
#[no_mangle]
pub extern "C" fn cohortguard_monitor_new(capacity: usize) -> *mut DriftMonitor {
    match DriftMonitor::new(capacity) {
        Ok(monitor) => Box::into_raw(Box::new(monitor)),
        Err(err) => {
            tracing::warn!(error = %err, capacity, "monitor_new rejected");
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "C" fn cohortguard_monitor_set_reference(
    monitor: *const DriftMonitor,
    values: *const f64,
    len: usize,
) -> u32 {
    let Some(monitor) = (unsafe { monitor.as_ref() }) else {
        return GuardCode::InvalidInput as u32;
    };
    if values.is_null() {
        return GuardCode::Config as u32;
    }
    let values = unsafe { slice::from_raw_parts(values, len) }.to_vec();
    status(ReferenceDistribution::new(values).and_then(|r| monitor.set_reference(&r)))
}

#[no_mangle]
pub extern "C" fn cohortguard_monitor_observe(monitor: *const DriftMonitor, probability: f64) {
    if let Some(monitor) = unsafe { monitor.as_ref() } {
        monitor.observe(probability);
    }
}

/// Current PSI; 0 for a null handle, like any other not-ready monitor.
#[no_mangle]
pub extern "C" fn cohortguard_monitor_psi(monitor: *const DriftMonitor) -> f64 {
    match unsafe { monitor.as_ref() } {
        Some(monitor) => monitor.current_psi(),
        None => 0.0,
    }
}

#[no_mangle]
pub extern "C" fn cohortguard_monitor_free(monitor: *mut DriftMonitor) {
    if monitor.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(monitor));
    }
}

/// Grid-search the default 0.1..=0.9 candidates over `len` scored labels.
///
/// On success writes the threshold and profit through the out-pointers.
#[no_mangle]
pub extern "C" fn cohortguard_optimize(
    probabilities: *const f64,
    labels: *const u8,
    len: usize,
    reward_per_conversion: f64,
    cost_per_call: f64,
    out_threshold: *mut f64,
    out_profit: *mut f64,
) -> u32 {
    if probabilities.is_null() || labels.is_null() || out_threshold.is_null() || out_profit.is_null()
    {
        return GuardCode::InvalidInput as u32;
    }
    let (probabilities, labels) = unsafe {
        (
            slice::from_raw_parts(probabilities, len),
            slice::from_raw_parts(labels, len),
        )
    };
    let validation: Vec<ScoredLabel> = probabilities
        .iter()
        .zip(labels)
        .map(|(&p, &y)| ScoredLabel::from((p, y)))
        .collect();

    let result = Economics::new(reward_per_conversion, cost_per_call).and_then(|economics| {
        let grid = training_service::threshold_grid(0.1, 0.9, 9);
        training_service::optimize(&grid, &validation, economics)
    });
    match result {
        Ok(best) => {
            unsafe {
                *out_threshold = best.threshold;
                *out_profit = best.profit;
            }
            GuardCode::Ok as u32
        }
        Err(err) => status::<()>(Err(err)),
    }
}

/// Free strings allocated by Rust.
#[no_mangle]
pub extern "C" fn cohortguard_free_str(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(ptr as *mut c_char);
    }
}

fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

fn string_to_raw(s: String) -> *const c_char {
    match CString::new(s) {
        Ok(cstring) => cstring.into_raw(),
        Err(_) => std::ptr::null(),
    }
}

fn status<T>(result: GuardResult<T>) -> u32 {
    match result {
        Ok(_) => GuardCode::Ok as u32,
        Err(err) => {
            tracing::warn!(error = %err, "ffi call failed");
            err.code() as u32
        }
    }
}
