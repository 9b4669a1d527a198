//! # Error Types
//!
//! Failure classification shared by every subsystem that talks to the ledger.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry classification of a failure, attached where the failure is raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Timeouts, rate limiting. Retryable.
    Transient,
    /// Connectivity failures. Retryable.
    Network,
    /// Ledger-level validation rejection. Never retryable.
    Logical,
    /// Unclassified. Not retryable by default.
    Unknown,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::Network)
    }
}

/// Failure returned by a ledger-facing port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class:?} ledger error: {message}")]
pub struct LedgerError {
    pub class: ErrorClass,
    pub message: String,
}

impl LedgerError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Transient, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Network, message)
    }

    pub fn logical(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Logical, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.class.is_retryable()
    }
}
