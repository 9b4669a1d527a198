//! Error types for the transaction tracker.

use super::entities::TxStatus;
use thiserror::Error;

/// Transaction tracker errors.
///
/// Every variant is raised before any write; a failed call leaves the
/// record exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// No record for this idempotency key / external ref.
    #[error("Transaction not found: {key}")]
    NotFound { key: String },

    /// Move not present in the state table.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: TxStatus, to: TxStatus },

    /// Another writer changed the record between read and write.
    #[error("Concurrent modification of {key}: expected revision {expected_revision}")]
    ConcurrentModification { key: String, expected_revision: u64 },

    /// External ref already belongs to another attempt.
    #[error("External ref {external_ref} already tracked by another attempt")]
    DuplicateExternalRef { external_ref: String },

    /// Retry requested for an attempt that may not be retried.
    #[error("Transaction {key} cannot be retried: {reason}")]
    CannotRetry { key: String, reason: String },

    /// Batch status lookup over the limit.
    #[error("Batch too large: {size} > {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Caller supplied an unusable argument.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Backing store failed.
    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

impl TrackerError {
    pub fn not_found(key: impl Into<String>) -> Self {
        TrackerError::NotFound { key: key.into() }
    }
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = TrackerError::not_found("idem-9");
        assert_eq!(err.to_string(), "Transaction not found: idem-9");
    }

    #[test]
    fn test_batch_too_large_message() {
        let err = TrackerError::BatchTooLarge { size: 51, max: 50 };
        assert!(err.to_string().contains("51 > 50"));
    }
}
