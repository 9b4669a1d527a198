//! # Reconciliation Metrics
//!
//! Prometheus metrics for reconciliation passes.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! ls-05-reconciliation = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `ledger_sync_reconciliation_runs_total` - Passes completed
//! - `ledger_sync_reconciliation_checked_total` - Attempts examined
//! - `ledger_sync_reconciliation_healed_total` - Attempts moved to ledger truth (by action)
//! - `ledger_sync_reconciliation_failed_total` - Items that raised an error
//! - `ledger_sync_reconciliation_phantoms_total` - Untracked executions found
//! - `ledger_sync_reconciliation_duration_ms` - Pass duration

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

#[cfg(feature = "metrics")]
use crate::domain::ReconciliationReport;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Passes completed
    pub static ref RUNS: IntCounter = register_int_counter!(
        "ledger_sync_reconciliation_runs_total",
        "Total number of reconciliation passes"
    )
    .expect("Failed to create RUNS metric");

    /// Attempts examined
    pub static ref CHECKED: IntCounter = register_int_counter!(
        "ledger_sync_reconciliation_checked_total",
        "Total number of tracked attempts examined"
    )
    .expect("Failed to create CHECKED metric");

    /// Attempts healed, labeled by action
    pub static ref HEALED: IntCounterVec = register_int_counter_vec!(
        "ledger_sync_reconciliation_healed_total",
        "Total number of attempts moved to ledger truth",
        &["action"]
    )
    .expect("Failed to create HEALED metric");

    /// Items that raised an error
    pub static ref FAILED: IntCounter = register_int_counter!(
        "ledger_sync_reconciliation_failed_total",
        "Total number of reconciliation items that failed"
    )
    .expect("Failed to create FAILED metric");

    /// Untracked executions found
    pub static ref PHANTOMS: IntCounter = register_int_counter!(
        "ledger_sync_reconciliation_phantoms_total",
        "Total number of confirmed executions with no tracked attempt"
    )
    .expect("Failed to create PHANTOMS metric");

    /// Pass duration in milliseconds
    pub static ref DURATION: Histogram = register_histogram!(
        "ledger_sync_reconciliation_duration_ms",
        "Reconciliation pass duration in milliseconds",
        vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0]
    )
    .expect("Failed to create DURATION metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a completed pass
#[cfg(feature = "metrics")]
pub fn record_pass(report: &ReconciliationReport) {
    RUNS.inc();
    CHECKED.inc_by(report.checked as u64);
    FAILED.inc_by(report.failed as u64);
    PHANTOMS.inc_by(report.phantoms as u64);
    for detail in report.details.iter().filter(|d| d.action.is_heal()) {
        HEALED.with_label_values(&[detail.action.as_str()]).inc();
    }
    DURATION.observe(report.completed_at.saturating_sub(report.started_at) as f64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_pass(_report: &crate::domain::ReconciliationReport) {}
