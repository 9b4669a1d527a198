//! # Ledger-Sync
//!
//! Entry point for the Ledger-Sync service.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (`LS_LOG_LEVEL`, `LS_JSON_LOGS`, ...)
//! 2. Load and validate configuration (`LS_*` variables)
//! 3. Build the runtime and start its tasks
//! 4. Run until Ctrl+C, then shut down gracefully

use std::sync::Arc;

use anyhow::{Context, Result};
use ls_04_event_listener::MockLedgerSource;
use ls_05_reconciliation::MockChainState;
use shared_types::SystemTimeSource;
use sync_runtime::{RuntimeConfig, SyncRuntime};
use sync_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("===========================================");
    info!("  Ledger-Sync v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    // The HTTP ledger client lives outside this workspace.
    warn!("No ledger client configured, running against an in-memory ledger");
    let runtime = SyncRuntime::new(
        config,
        Arc::new(MockLedgerSource::new()),
        Arc::new(MockChainState::new()),
        Arc::new(SystemTimeSource),
    );
    runtime.start().await?;

    info!("Ledger-Sync is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await?;
    Ok(())
}
