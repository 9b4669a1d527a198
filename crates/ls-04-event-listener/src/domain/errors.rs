//! Error types for the event listener.

use ls_03_event_processor::ProcessorError;
use shared_types::LedgerError;
use thiserror::Error;

/// Event listener errors.
///
/// Per-event ingestion failures are logged and counted, not returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// Ledger event source failed.
    #[error("Ledger source error: {0}")]
    Source(#[from] LedgerError),

    /// Processor failed outside per-event ingestion.
    #[error("Processor error: {0}")]
    Processor(#[from] ProcessorError),
}

/// Result type for listener operations.
pub type ListenerResult<T> = Result<T, ListenerError>;
