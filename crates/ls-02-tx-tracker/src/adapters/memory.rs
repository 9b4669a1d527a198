//! In-memory transaction store.
//!
//! One mutex over all indexes; every port call is a single critical section,
//! which is the transactional guarantee the tracker relies on.

use crate::domain::{TrackedTransaction, TrackerError, TrackerResult, TxStatus};
use crate::ports::TransactionStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    /// idempotency key -> (insertion sequence, record)
    records: HashMap<String, (u64, TrackedTransaction)>,
    /// external ref -> idempotency key
    by_ref: HashMap<String, String>,
    /// canonical key -> idempotency keys
    by_canonical: HashMap<String, Vec<String>>,
    next_seq: u64,
    inserts: usize,
}

impl Inner {
    fn collect<'a>(&'a self, keys: impl Iterator<Item = &'a String>) -> Vec<(u64, TrackedTransaction)> {
        keys.filter_map(|k| self.records.get(k).cloned()).collect()
    }
}

/// In-memory implementation of [`TransactionStore`].
#[derive(Default)]
pub struct InMemoryTransactionStore {
    inner: Mutex<Inner>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful inserts since creation.
    pub fn insert_count(&self) -> usize {
        self.inner.lock().inserts
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert_if_absent(
        &self,
        record: TrackedTransaction,
    ) -> TrackerResult<(TrackedTransaction, bool)> {
        let mut inner = self.inner.lock();
        if let Some((_, existing)) = inner.records.get(&record.idempotency_key) {
            return Ok((existing.clone(), false));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.inserts += 1;
        inner
            .by_canonical
            .entry(record.canonical_key.clone())
            .or_default()
            .push(record.idempotency_key.clone());
        if let Some(ext) = &record.external_ref {
            inner
                .by_ref
                .insert(ext.clone(), record.idempotency_key.clone());
        }
        inner
            .records
            .insert(record.idempotency_key.clone(), (seq, record.clone()));
        Ok((record, true))
    }

    async fn get_by_idempotency_key(&self, key: &str) -> TrackerResult<Option<TrackedTransaction>> {
        Ok(self.inner.lock().records.get(key).map(|(_, r)| r.clone()))
    }

    async fn get_by_external_ref(
        &self,
        external_ref: &str,
    ) -> TrackerResult<Option<TrackedTransaction>> {
        let inner = self.inner.lock();
        Ok(inner
            .by_ref
            .get(external_ref)
            .and_then(|key| inner.records.get(key))
            .map(|(_, r)| r.clone()))
    }

    async fn list_by_canonical_key(
        &self,
        canonical_key: &str,
    ) -> TrackerResult<Vec<TrackedTransaction>> {
        let inner = self.inner.lock();
        let mut rows = match inner.by_canonical.get(canonical_key) {
            Some(keys) => inner.collect(keys.iter()),
            None => Vec::new(),
        };
        rows.sort_by(|(sa, a), (sb, b)| b.prepared_at.cmp(&a.prepared_at).then(sb.cmp(sa)));
        Ok(rows.into_iter().map(|(_, r)| r).collect())
    }

    async fn list_by_status(&self, statuses: &[TxStatus]) -> TrackerResult<Vec<TrackedTransaction>> {
        let inner = self.inner.lock();
        let mut rows: Vec<_> = inner
            .records
            .values()
            .filter(|(_, r)| statuses.contains(&r.status))
            .cloned()
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| a.prepared_at.cmp(&b.prepared_at).then(sa.cmp(sb)));
        Ok(rows.into_iter().map(|(_, r)| r).collect())
    }

    async fn compare_and_swap(
        &self,
        record: &TrackedTransaction,
        expected_revision: u64,
    ) -> TrackerResult<()> {
        let mut inner = self.inner.lock();
        let key = &record.idempotency_key;

        let (seq, old_ref) = match inner.records.get(key) {
            None => return Err(TrackerError::not_found(key.clone())),
            Some((_, stored)) if stored.revision != expected_revision => {
                return Err(TrackerError::ConcurrentModification {
                    key: key.clone(),
                    expected_revision,
                })
            }
            Some((seq, stored)) => (*seq, stored.external_ref.clone()),
        };

        if let Some(ext) = &record.external_ref {
            if let Some(owner) = inner.by_ref.get(ext) {
                if owner != key {
                    return Err(TrackerError::DuplicateExternalRef {
                        external_ref: ext.clone(),
                    });
                }
            }
        }

        if old_ref != record.external_ref {
            if let Some(old) = old_ref {
                inner.by_ref.remove(&old);
            }
            if let Some(ext) = &record.external_ref {
                inner.by_ref.insert(ext.clone(), key.clone());
            }
        }
        inner.records.insert(key.clone(), (seq, record.clone()));
        Ok(())
    }
}
