//! In-memory nonce store.
//!
//! A single mutex over the whole map gives per-key atomicity for free.

use crate::domain::{NonceError, NonceKey, NonceResult};
use crate::ports::NonceStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct Inner {
    counters: HashMap<NonceKey, u64>,
    consumed: HashSet<(NonceKey, String)>,
}

/// In-memory implementation of [`NonceStore`].
#[derive(Default)]
pub struct InMemoryNonceStore {
    inner: Mutex<Inner>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a stored counter.
    pub fn len(&self) -> usize {
        self.inner.lock().counters.len()
    }

    /// True if no counter was ever written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn bump(counters: &mut HashMap<NonceKey, u64>, key: &NonceKey) -> NonceResult<u64> {
    let slot = counters.entry(key.clone()).or_insert(0);
    let next = slot
        .checked_add(1)
        .ok_or_else(|| NonceError::Overflow { key: key.clone() })?;
    *slot = next;
    Ok(next)
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn get(&self, key: &NonceKey) -> NonceResult<u64> {
        Ok(self.inner.lock().counters.get(key).copied().unwrap_or(0))
    }

    async fn increment(&self, key: &NonceKey) -> NonceResult<u64> {
        bump(&mut self.inner.lock().counters, key)
    }

    async fn increment_once(&self, key: &NonceKey, attempt_id: &str) -> NonceResult<Option<u64>> {
        let mut inner = self.inner.lock();
        let marker = (key.clone(), attempt_id.to_string());
        if inner.consumed.contains(&marker) {
            return Ok(None);
        }
        let next = bump(&mut inner.counters, key)?;
        inner.consumed.insert(marker);
        Ok(Some(next))
    }

    async fn set(&self, key: &NonceKey, value: u64) -> NonceResult<()> {
        self.inner.lock().counters.insert(key.clone(), value);
        Ok(())
    }

    async fn set_many(&self, values: &[(NonceKey, u64)]) -> NonceResult<()> {
        let mut inner = self.inner.lock();
        for (key, value) in values {
            inner.counters.insert(key.clone(), *value);
        }
        Ok(())
    }
}
