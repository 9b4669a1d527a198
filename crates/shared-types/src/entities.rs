//! # Core Entities
//!
//! Identifiers and descriptors that cross subsystem boundaries.

use serde::{Deserialize, Serialize};

/// Ledger block height.
pub type BlockHeight = u64;

/// Ledger-assigned transaction id / hash, known only after submission.
pub type ExternalRef = String;

/// An action as described by the caller layer.
///
/// The core stores `inputs` verbatim and never inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Program (contract) identifier, e.g. `sealed_rfq_v1.aleo`.
    pub program: String,
    /// Function / transition name, e.g. `create_rfq`.
    pub function: String,
    /// Serialized inputs, owned by the caller.
    pub inputs: serde_json::Value,
    /// Fee offered for execution.
    pub fee: u64,
}

impl ActionDescriptor {
    /// Create a new descriptor.
    pub fn new(
        program: impl Into<String>,
        function: impl Into<String>,
        inputs: serde_json::Value,
        fee: u64,
    ) -> Self {
        Self {
            program: program.into(),
            function: function.into(),
            inputs,
            fee,
        }
    }
}
