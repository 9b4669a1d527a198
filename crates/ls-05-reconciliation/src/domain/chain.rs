//! Ledger answers consumed by reconciliation.

use serde::{Deserialize, Serialize};
use shared_types::{BlockHeight, ErrorClass, ExternalRef};

/// Ledger status of one submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxChainStatus {
    Pending,
    Confirmed {
        block_height: BlockHeight,
        block_hash: String,
    },
    Rejected {
        error: String,
        #[serde(default)]
        error_code: i32,
        /// Set when the ledger client could classify the failure.
        #[serde(default)]
        error_class: Option<ErrorClass>,
    },
    NotFound,
}

/// Whether a logical action was executed on the ledger, by anyone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExecution {
    pub executed: bool,
    pub external_ref: Option<ExternalRef>,
    pub block_height: Option<BlockHeight>,
    pub block_hash: Option<String>,
}

impl ActionExecution {
    pub fn not_executed() -> Self {
        Self::default()
    }
}

/// A confirmed ledger event, reduced to what phantom detection needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedEventRef {
    pub tx_id: ExternalRef,
    pub transition: String,
    pub block_height: BlockHeight,
}
