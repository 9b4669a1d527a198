//! Error types for the event processor.

use shared_types::BlockHeight;
use thiserror::Error;

/// Event processor errors.
///
/// Any error inside an ingestion aborts the whole store transaction; a
/// duplicate event is not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    /// Transition name maps to no known event kind.
    #[error("Unknown transition: {transition}")]
    UnknownTransition { transition: String },

    /// Payload does not match the shape of its event kind.
    #[error("Cannot decode {transition} payload: {reason}")]
    Decode { transition: String, reason: String },

    /// Event refers to an aggregate that does not exist.
    #[error("Missing {kind} {id}")]
    MissingAggregate { kind: &'static str, id: String },

    /// Creation event for an aggregate that already exists.
    #[error("{kind} {id} already exists")]
    AggregateExists { kind: &'static str, id: String },

    /// No checkpoint at the requested height.
    #[error("No checkpoint at block {height}")]
    CheckpointNotFound { height: BlockHeight },

    /// Reorg would rewrite a finalized block.
    #[error("Reorg at block {height} is beyond finality")]
    ReorgBeyondFinality { height: BlockHeight },

    /// Canonical encoding for the hash chain failed.
    #[error("Encoding error: {reason}")]
    Encoding { reason: String },

    /// Backing store failed.
    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

/// Result type for processor operations.
pub type ProcessorResult<T> = Result<T, ProcessorError>;
