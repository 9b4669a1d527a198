//! Error types for the nonce manager.

use super::entities::NonceKey;
use thiserror::Error;

/// Nonce manager errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NonceError {
    /// Counter cannot move past `u64::MAX`.
    #[error("Nonce overflow for {key}")]
    Overflow { key: NonceKey },

    /// Actor identifier is empty.
    #[error("Invalid actor: {reason}")]
    InvalidActor { reason: String },

    /// Backing store failed.
    #[error("Storage error: {reason}")]
    Storage { reason: String },
}

/// Result type for nonce operations.
pub type NonceResult<T> = Result<T, NonceError>;
