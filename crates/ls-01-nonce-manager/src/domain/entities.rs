//! Nonce domain entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action classes that carry a replay-protection nonce on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceAction {
    /// Sealed bid commitment.
    Commit,
    /// Bid reveal.
    Reveal,
    /// Escrow payment release.
    Payment,
}

impl NonceAction {
    /// All action classes, in a stable order.
    pub const ALL: [NonceAction; 3] = [NonceAction::Commit, NonceAction::Reveal, NonceAction::Payment];

    /// Wire name of the action class.
    pub fn as_str(&self) -> &'static str {
        match self {
            NonceAction::Commit => "commit",
            NonceAction::Reveal => "reveal",
            NonceAction::Payment => "payment",
        }
    }
}

impl fmt::Display for NonceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage key: one counter per (actor, action class).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonceKey {
    /// Actor address.
    pub actor: String,
    /// Action class.
    pub action: NonceAction,
}

impl NonceKey {
    /// Create a new key.
    pub fn new(actor: impl Into<String>, action: NonceAction) -> Self {
        Self {
            actor: actor.into(),
            action,
        }
    }
}

impl fmt::Display for NonceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.actor, self.action)
    }
}

/// Outcome of validating a caller-provided nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceValidation {
    /// `provided == expected`.
    pub valid: bool,
    /// The only nonce the ledger will accept next (`stored + 1`).
    pub expected: u64,
}

/// Nonces observed on the ledger for one actor, used by admin resync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedNonces {
    pub commit: u64,
    pub reveal: u64,
    pub payment: u64,
}

impl ObservedNonces {
    /// Observed value for one action class.
    pub fn get(&self, action: NonceAction) -> u64 {
        match action {
            NonceAction::Commit => self.commit,
            NonceAction::Reveal => self.reveal,
            NonceAction::Payment => self.payment,
        }
    }
}
