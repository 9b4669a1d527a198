//! # Caller-Layer Scenarios
//!
//! Flows the caller layer drives across the tracker, the nonce manager, the
//! event processor and reconciliation, wired through the runtime container.
//!
//! ## Flows Tested:
//!
//! 1. **Happy path**: prepare -> submit -> confirm, then immutability
//! 2. **Replayed prepare**: first write wins
//! 3. **Nonce discipline**: validate / increment only after confirmation
//! 4. **Pending then confirmed**: staging row promoted exactly once
//! 5. **Reconciliation heal**: a lost confirmation is recovered from the ledger
//! 6. **Retry chain**: retryable rejection -> new attempt under the same action

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{action, confirmed, pending, GENESIS_MS};
    use ls_01_nonce_manager::{NonceAction, NonceManagerApi};
    use ls_02_tx_tracker::{
        ErrorClass, Rejection, TrackerError, TransactionTrackerApi, TxStatus, TxStatusEntry,
    };
    use ls_03_event_processor::{EventProcessorApi, IngestOutcome, RfqStatus};
    use ls_05_reconciliation::{
        MockChainState, ReconciliationAction, ReconciliationApi, ReconciliationConfig,
        ReconciliationJob, TxChainStatus,
    };
    use serde_json::json;
    use shared_types::{ManualTimeSource, TimeSource};
    use std::sync::Arc;
    use sync_runtime::{ConcreteReconciliation, ProcessorEventFeed, RuntimeConfig, SyncContainer};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Harness {
        clock: Arc<ManualTimeSource>,
        container: SyncContainer,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualTimeSource::new(GENESIS_MS));
        let container = SyncContainer::new(&RuntimeConfig::default(), clock.clone());
        Harness { clock, container }
    }

    fn reconciliation(
        harness: &Harness,
        chain: Arc<MockChainState>,
    ) -> ConcreteReconciliation<MockChainState> {
        ReconciliationJob::new(
            harness.container.tracker.clone(),
            chain,
            Arc::new(ProcessorEventFeed::new(harness.container.processor.clone())),
            harness.clock.clone(),
            ReconciliationConfig::for_testing(),
        )
    }

    fn create_rfq_payload(rfq_id: &str) -> serde_json::Value {
        json!({
            "rfq_id": rfq_id,
            "buyer": "aleo1buyer",
            "bidding_deadline": 600,
            "reveal_deadline": 700,
            "min_bid": 100,
        })
    }

    // =============================================================================
    // SCENARIO A: prepare -> submit -> confirm
    // =============================================================================

    #[tokio::test]
    async fn test_confirmed_attempt_is_final() {
        let h = harness();
        let tracker = &h.container.tracker;

        tracker
            .prepare(&action("create_rfq", json!(["123u64"])), "create_rfq:123", "idem-1", None)
            .await
            .unwrap();
        h.clock.advance(1_000);
        tracker.mark_submitted("idem-1", "ext-1", None).await.unwrap();
        h.clock.advance(1_000);
        let tx = tracker
            .mark_confirmed("ext-1", 500, "hash-500", Some(json!({ "status": "accepted" })))
            .await
            .unwrap();

        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tx.status_history.len(), 3);
        assert_eq!(tx.block_height, Some(500));
        assert_eq!(tx.confirmed_at, Some(GENESIS_MS + 2_000));

        // Terminal: every further move fails and writes nothing.
        let err = tracker.mark_expired("idem-1").await.unwrap_err();
        assert_eq!(
            err,
            TrackerError::InvalidTransition {
                from: TxStatus::Confirmed,
                to: TxStatus::Expired,
            }
        );
        let err = tracker
            .mark_rejected("idem-1", Rejection::new("late", 0, None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidTransition { .. }));

        let stored = tracker.get_by_idempotency_key("idem-1").await.unwrap().unwrap();
        assert_eq!(stored, tx);
        assert!(!tracker.has_active_attempt("create_rfq:123").await.unwrap());
    }

    // =============================================================================
    // SCENARIO B: replayed prepare
    // =============================================================================

    #[tokio::test]
    async fn test_replayed_prepare_returns_first_record() {
        let h = harness();
        let tracker = &h.container.tracker;

        let first = tracker
            .prepare(&action("create_rfq", json!(["1u64"])), "create_rfq:1", "idem-2", None)
            .await
            .unwrap();
        h.clock.advance(50);
        let second = tracker
            .prepare(&action("create_rfq", json!(["2u64"])), "create_rfq:2", "idem-2", None)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.inputs, json!(["1u64"]));
        assert_eq!(second.canonical_key, "create_rfq:1");
        assert!(tracker.get_by_canonical_key("create_rfq:2").await.unwrap().is_empty());
    }

    // =============================================================================
    // SCENARIO C: nonce discipline
    // =============================================================================

    #[tokio::test]
    async fn test_nonce_advances_only_on_confirmation() {
        let h = harness();
        let nonces = &h.container.nonce_manager;

        let check = nonces.validate("actorA", NonceAction::Commit, 1).await.unwrap();
        assert!(check.valid);

        nonces.increment("actorA", NonceAction::Commit).await.unwrap();
        let check = nonces.validate("actorA", NonceAction::Commit, 1).await.unwrap();
        assert!(!check.valid);
        assert_eq!(check.expected, 2);

        // Other action classes are independent counters.
        let reveal = nonces.validate("actorA", NonceAction::Reveal, 1).await.unwrap();
        assert!(reveal.valid);
    }

    #[tokio::test]
    async fn test_caller_flow_consumes_nonce_once_per_confirmed_attempt() {
        let h = harness();
        let tracker = &h.container.tracker;
        let nonces = &h.container.nonce_manager;

        let nonce = nonces.get_next_nonce("vendor", NonceAction::Commit).await.unwrap();
        assert_eq!(nonce, 1);
        tracker
            .prepare(
                &action("submit_bid_commit", json!(["rfq-1", nonce.to_string()])),
                "submit_bid_commit:rfq-1:vendor",
                "idem-commit",
                None,
            )
            .await
            .unwrap();
        tracker.mark_submitted("idem-commit", "at1commit", None).await.unwrap();

        // Broadcast is not consumption.
        assert_eq!(nonces.current_nonce("vendor", NonceAction::Commit).await.unwrap(), 0);

        tracker.mark_confirmed("at1commit", 42, "hash-42", None).await.unwrap();
        let consumed = nonces
            .increment_confirmed("vendor", NonceAction::Commit, "idem-commit")
            .await
            .unwrap();
        assert_eq!(consumed, Some(1));

        // A replayed confirmation is a no-op.
        let replay = nonces
            .increment_confirmed("vendor", NonceAction::Commit, "idem-commit")
            .await
            .unwrap();
        assert_eq!(replay, None);
        assert_eq!(nonces.get_next_nonce("vendor", NonceAction::Commit).await.unwrap(), 2);
    }

    // =============================================================================
    // SCENARIO D: pending then confirmed
    // =============================================================================

    #[tokio::test]
    async fn test_pending_event_promoted_exactly_once() {
        let h = harness();
        let processor = &h.container.processor;
        let payload = create_rfq_payload("rfq-d");

        let staged = processor
            .ingest(pending("at1d", "create_rfq", 0, 10, payload.clone()))
            .await
            .unwrap();
        assert_eq!(staged.outcome, IngestOutcome::Staged);
        assert_eq!(processor.staging_events().await.unwrap().len(), 1);
        assert_eq!(processor.ledger_event_count().await.unwrap(), 0);
        assert!(processor.get_rfq("rfq-d").await.unwrap().is_none());

        let applied = processor
            .ingest(confirmed("at1d", "create_rfq", 0, 10, payload.clone()))
            .await
            .unwrap();
        assert!(matches!(applied.outcome, IngestOutcome::Applied { .. }));
        assert!(processor.staging_events().await.unwrap().is_empty());
        assert_eq!(processor.ledger_event_count().await.unwrap(), 1);
        let rfq = processor.get_rfq("rfq-d").await.unwrap().unwrap();
        assert_eq!(rfq.status, RfqStatus::Open);

        // Redelivery of either form changes nothing.
        for event in [
            confirmed("at1d", "create_rfq", 0, 10, payload.clone()),
            pending("at1d", "create_rfq", 0, 10, payload),
        ] {
            let receipt = processor.ingest(event).await.unwrap();
            assert_eq!(receipt.outcome, IngestOutcome::Duplicate);
        }
        assert_eq!(processor.ledger_event_count().await.unwrap(), 1);
        assert!(processor.staging_events().await.unwrap().is_empty());
    }

    // =============================================================================
    // SCENARIO E: reconciliation heals a lost confirmation
    // =============================================================================

    #[tokio::test]
    async fn test_reconciliation_confirms_submitted_attempt() {
        let h = harness();
        let tracker = &h.container.tracker;
        let chain = Arc::new(MockChainState::new());
        let job = reconciliation(&h, chain.clone());

        tracker
            .prepare(&action("create_rfq", json!(["9u64"])), "create_rfq:9", "idem-e", None)
            .await
            .unwrap();
        tracker.mark_submitted("idem-e", "ext-e", None).await.unwrap();
        chain.set_status(
            "ext-e",
            TxChainStatus::Confirmed {
                block_height: 77,
                block_hash: "hash-77".to_string(),
            },
        );
        h.clock.advance(5_000);

        let report = job.run_once().await;
        assert_eq!(report.checked, 1);
        assert_eq!(report.healed, 1);
        assert_eq!(report.count(ReconciliationAction::Confirmed), 1);

        let tx = tracker.get_by_idempotency_key("idem-e").await.unwrap().unwrap();
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tx.block_height, Some(77));
        assert_eq!(tx.last_reconciled_at, Some(h.clock.now()));
        assert_eq!(tx.reconcile_attempts, 1);
        assert!(tx.raw_response.is_some());
        assert_eq!(job.last_report(), Some(report));
    }

    // =============================================================================
    // RETRY CHAIN
    // =============================================================================

    #[tokio::test]
    async fn test_retryable_rejection_opens_new_attempt() {
        let h = harness();
        let tracker = &h.container.tracker;
        let reveal = action("reveal_bid", json!(["rfq-1", "900u64"]));

        tracker
            .prepare(&reveal, "reveal_bid:rfq-1:vendor", "idem-r", None)
            .await
            .unwrap();
        tracker.mark_submitted("idem-r", "at1r", None).await.unwrap();
        tracker
            .mark_rejected(
                "idem-r",
                Rejection::new("request timed out", 0, Some(ErrorClass::Transient)),
                None,
            )
            .await
            .unwrap();
        assert!(tracker.can_retry("idem-r").await.unwrap());
        assert!(!tracker.has_active_attempt("reveal_bid:rfq-1:vendor").await.unwrap());

        let ticket = tracker.begin_retry("idem-r").await.unwrap();
        assert_eq!(ticket.new_idempotency_key, "idem-r_retry_1");
        assert_eq!(ticket.canonical_key, "reveal_bid:rfq-1:vendor");

        tracker
            .prepare(&reveal, &ticket.canonical_key, &ticket.new_idempotency_key, None)
            .await
            .unwrap();
        assert!(tracker.has_active_attempt("reveal_bid:rfq-1:vendor").await.unwrap());

        let attempts = tracker.get_by_canonical_key("reveal_bid:rfq-1:vendor").await.unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].idempotency_key, "idem-r_retry_1");

        let statuses = tracker
            .batch_status(&[
                "idem-r".to_string(),
                "idem-r_retry_1".to_string(),
                "missing".to_string(),
            ])
            .await
            .unwrap();
        assert!(matches!(
            statuses[0].1,
            TxStatusEntry::Found { status: TxStatus::Rejected, .. }
        ));
        assert!(matches!(
            statuses[1].1,
            TxStatusEntry::Found { status: TxStatus::Prepared, .. }
        ));
        assert!(matches!(statuses[2].1, TxStatusEntry::NotFound));
    }

    #[tokio::test]
    async fn test_logical_rejection_is_not_retried() {
        let h = harness();
        let tracker = &h.container.tracker;

        tracker
            .prepare(&action("select_winner", json!([])), "select_winner:rfq-1", "idem-l", None)
            .await
            .unwrap();
        tracker.mark_submitted("idem-l", "at1l", None).await.unwrap();
        tracker
            .mark_rejected(
                "idem-l",
                Rejection::new("assertion failed", 17, Some(ErrorClass::Logical)),
                None,
            )
            .await
            .unwrap();

        assert!(!tracker.can_retry("idem-l").await.unwrap());
        let err = tracker.begin_retry("idem-l").await.unwrap_err();
        assert!(matches!(err, TrackerError::CannotRetry { .. }));
    }
}
