//! Driving port: reconciliation API.

use crate::domain::ReconciliationReport;
use async_trait::async_trait;

/// Reconciliation job API.
#[async_trait]
pub trait ReconciliationApi: Send + Sync {
    /// Run one pass now. Per-item failures are reported, never returned.
    async fn run_once(&self) -> ReconciliationReport;

    /// Report of the most recent pass, if any.
    fn last_report(&self) -> Option<ReconciliationReport>;
}
