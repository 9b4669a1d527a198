//! # Event Processor Metrics
//!
//! Prometheus metrics for ingestion and reorg handling.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! ls-03-event-processor = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `ledger_sync_events_ingested_total` - Confirmed events applied (by kind)
//! - `ledger_sync_events_staged_total` - Pending events staged
//! - `ledger_sync_events_duplicate_total` - Events skipped as already ingested
//! - `ledger_sync_events_failed_total` - Events rejected (by reason)
//! - `ledger_sync_reorgs_total` - Reorgs handled
//! - `ledger_sync_events_rolled_back_total` - Log entries deleted by reorgs
//! - `ledger_sync_checkpoints_finalized_total` - Checkpoints finalized

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Confirmed events applied, labeled by kind
    pub static ref EVENTS_INGESTED: IntCounterVec = register_int_counter_vec!(
        "ledger_sync_events_ingested_total",
        "Total number of confirmed events applied",
        &["kind"]
    )
    .expect("Failed to create EVENTS_INGESTED metric");

    /// Pending events staged
    pub static ref EVENTS_STAGED: IntCounter = register_int_counter!(
        "ledger_sync_events_staged_total",
        "Total number of pending events written to staging"
    )
    .expect("Failed to create EVENTS_STAGED metric");

    /// Duplicate events skipped
    pub static ref EVENTS_DUPLICATE: IntCounter = register_int_counter!(
        "ledger_sync_events_duplicate_total",
        "Total number of events skipped as already ingested"
    )
    .expect("Failed to create EVENTS_DUPLICATE metric");

    /// Events rejected, labeled by reason
    pub static ref EVENTS_FAILED: IntCounterVec = register_int_counter_vec!(
        "ledger_sync_events_failed_total",
        "Total number of events rejected",
        &["reason"]
    )
    .expect("Failed to create EVENTS_FAILED metric");

    /// Reorgs handled
    pub static ref REORGS: IntCounter = register_int_counter!(
        "ledger_sync_reorgs_total",
        "Total number of chain reorganizations handled"
    )
    .expect("Failed to create REORGS metric");

    /// Log entries deleted by reorgs
    pub static ref EVENTS_ROLLED_BACK: IntCounter = register_int_counter!(
        "ledger_sync_events_rolled_back_total",
        "Total number of ledger events deleted by reorgs"
    )
    .expect("Failed to create EVENTS_ROLLED_BACK metric");

    /// Checkpoints finalized
    pub static ref CHECKPOINTS_FINALIZED: IntCounter = register_int_counter!(
        "ledger_sync_checkpoints_finalized_total",
        "Total number of checkpoints finalized"
    )
    .expect("Failed to create CHECKPOINTS_FINALIZED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a confirmed event applied
#[cfg(feature = "metrics")]
pub fn record_event_ingested(kind: &str) {
    EVENTS_INGESTED.with_label_values(&[kind]).inc();
}

/// Record a pending event staged
#[cfg(feature = "metrics")]
pub fn record_event_staged() {
    EVENTS_STAGED.inc();
}

/// Record a duplicate event skipped
#[cfg(feature = "metrics")]
pub fn record_duplicate() {
    EVENTS_DUPLICATE.inc();
}

/// Record an event rejected with reason
#[cfg(feature = "metrics")]
pub fn record_event_failed(reason: &str) {
    EVENTS_FAILED.with_label_values(&[reason]).inc();
}

/// Record a handled reorg
#[cfg(feature = "metrics")]
pub fn record_reorg(events_rolled_back: usize) {
    REORGS.inc();
    EVENTS_ROLLED_BACK.inc_by(events_rolled_back as u64);
}

/// Record checkpoints finalized
#[cfg(feature = "metrics")]
pub fn record_checkpoints_finalized(count: usize) {
    CHECKPOINTS_FINALIZED.inc_by(count as u64);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_event_ingested(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_event_staged() {}

#[cfg(not(feature = "metrics"))]
pub fn record_duplicate() {}

#[cfg(not(feature = "metrics"))]
pub fn record_event_failed(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_reorg(_events_rolled_back: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_checkpoints_finalized(_count: usize) {}
