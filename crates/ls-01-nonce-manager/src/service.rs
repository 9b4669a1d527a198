//! Nonce Manager Service
//!
//! Mirrors the ledger's per-actor replay-protection counters.

use crate::domain::{
    NonceAction, NonceError, NonceKey, NonceResult, NonceValidation, ObservedNonces,
};
use crate::ports::{NonceManagerApi, NonceStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Nonce manager over an injected store.
pub struct NonceManager<S: NonceStore> {
    store: Arc<S>,
}

impl<S: NonceStore> NonceManager<S> {
    /// Create a manager backed by `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn key(actor: &str, action: NonceAction) -> NonceResult<NonceKey> {
        if actor.trim().is_empty() {
            return Err(NonceError::InvalidActor {
                reason: "actor must not be empty".to_string(),
            });
        }
        Ok(NonceKey::new(actor, action))
    }

    fn next_after(key: &NonceKey, stored: u64) -> NonceResult<u64> {
        stored
            .checked_add(1)
            .ok_or_else(|| NonceError::Overflow { key: key.clone() })
    }
}

#[async_trait]
impl<S: NonceStore + 'static> NonceManagerApi for NonceManager<S> {
    async fn get_next_nonce(&self, actor: &str, action: NonceAction) -> NonceResult<u64> {
        let key = Self::key(actor, action)?;
        let stored = self.store.get(&key).await?;
        Self::next_after(&key, stored)
    }

    async fn current_nonce(&self, actor: &str, action: NonceAction) -> NonceResult<u64> {
        let key = Self::key(actor, action)?;
        self.store.get(&key).await
    }

    async fn validate(
        &self,
        actor: &str,
        action: NonceAction,
        provided: u64,
    ) -> NonceResult<NonceValidation> {
        let expected = self.get_next_nonce(actor, action).await?;
        let valid = provided == expected;
        if !valid {
            debug!(
                actor = actor,
                action = %action,
                provided = provided,
                expected = expected,
                "[ls-01] Rejected out-of-order nonce"
            );
        }
        Ok(NonceValidation { valid, expected })
    }

    async fn increment(&self, actor: &str, action: NonceAction) -> NonceResult<u64> {
        let key = Self::key(actor, action)?;
        let value = self.store.increment(&key).await?;
        info!(key = %key, nonce = value, "[ls-01] Nonce consumed");
        Ok(value)
    }

    async fn increment_confirmed(
        &self,
        actor: &str,
        action: NonceAction,
        idempotency_key: &str,
    ) -> NonceResult<Option<u64>> {
        let key = Self::key(actor, action)?;
        let consumed = self.store.increment_once(&key, idempotency_key).await?;
        match consumed {
            Some(value) => info!(
                key = %key,
                nonce = value,
                idempotency_key = idempotency_key,
                "[ls-01] Nonce consumed by confirmed attempt"
            ),
            None => debug!(
                key = %key,
                idempotency_key = idempotency_key,
                "[ls-01] Attempt already consumed its nonce"
            ),
        }
        Ok(consumed)
    }

    async fn sync_from_chain(&self, actor: &str, observed: ObservedNonces) -> NonceResult<()> {
        let mut changes = Vec::new();
        for action in NonceAction::ALL {
            let key = Self::key(actor, action)?;
            let local = self.store.get(&key).await?;
            let chain = observed.get(action);
            if local != chain {
                changes.push((key, local, chain));
            }
        }
        if changes.is_empty() {
            return Ok(());
        }

        let values: Vec<_> = changes
            .iter()
            .map(|(key, _, chain)| (key.clone(), *chain))
            .collect();
        self.store.set_many(&values).await?;

        for (key, local, chain) in changes {
            if chain < local {
                warn!(key = %key, local = local, chain = chain, "[ls-01] Ledger nonce behind local counter, reset");
            } else {
                info!(key = %key, local = local, chain = chain, "[ls-01] Nonce resynced from ledger");
            }
        }
        Ok(())
    }
}
