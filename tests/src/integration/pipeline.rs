//! # Event Pipeline
//!
//! Ledger events flowing through the listener into the processor, and the
//! processor's log feeding reconciliation.
//!
//! ## Flows Tested:
//!
//! 1. **Catch-up**: a full RFQ lifecycle projected from batched fetches
//! 2. **Audit**: hash chain and per-RFQ reconstruction agree with live state
//! 3. **Reorg**: a replaced block rolls back, re-applies and rewinds the cursor
//! 4. **Finality**: forks below the rollback window are refused
//! 5. **Phantoms**: ledger executions without a tracked attempt are reported
//! 6. **Runtime**: both long-lived tasks driving the same pipeline

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{
        action, block_hash, confirmed, rfq_lifecycle, Pipeline, GENESIS_MS,
    };
    use ls_02_tx_tracker::TransactionTrackerApi;
    use ls_03_event_processor::{EventProcessorApi, ProcessorConfig, RfqStatus};
    use ls_04_event_listener::{EventListenerApi, ListenerConfig, MockLedgerSource};
    use ls_05_reconciliation::{
        MockChainState, ReconciliationAction, ReconciliationApi, ReconciliationConfig,
        ReconciliationJob,
    };
    use serde_json::json;
    use shared_types::ManualTimeSource;
    use std::sync::Arc;
    use std::time::Duration;
    use sync_runtime::{ProcessorEventFeed, RuntimeConfig, SyncContainer, SyncRuntime};

    // =============================================================================
    // CATCH-UP AND AUDIT
    // =============================================================================

    #[tokio::test]
    async fn test_rfq_lifecycle_projected_from_catch_up() {
        let pipeline = Pipeline::new();
        pipeline.publish(&rfq_lifecycle("rfq-1", 10));

        let report = pipeline.listener.catch_up().await.unwrap();
        assert_eq!(report.head, 17);
        assert_eq!(report.events, 10);
        assert_eq!(pipeline.listener.last_processed_block(), 17);

        let stats = pipeline.listener.stats();
        assert_eq!(stats.events_applied, 10);
        assert_eq!(stats.failed, 0);

        let processor = &pipeline.processor;
        let rfq = processor.get_rfq("rfq-1").await.unwrap().unwrap();
        assert_eq!(rfq.status, RfqStatus::Completed);
        assert_eq!(rfq.winning_bid_id.as_deref(), Some("rfq-1-bid-1"));
        assert_eq!(rfq.winning_amount, Some(900));

        let winner = processor.get_bid("rfq-1-bid-1").await.unwrap().unwrap();
        assert!(winner.is_winner && winner.is_revealed);
        let loser = processor.get_bid("rfq-1-bid-2").await.unwrap().unwrap();
        assert_eq!(loser.revealed_amount, Some(950));
        assert!(!loser.is_winner && !loser.is_slashed);

        let escrow = processor.get_escrow("rfq-1").await.unwrap().unwrap();
        assert_eq!(escrow.total_amount, 900);
        assert_eq!(escrow.released_amount, 900);
        assert!(escrow.is_final);
        let payments = processor.get_payments("rfq-1").await.unwrap();
        assert_eq!(payments.iter().map(|p| p.amount).collect::<Vec<_>>(), vec![300, 600]);
    }

    #[tokio::test]
    async fn test_audit_trail_matches_live_state() {
        let pipeline = Pipeline::new();
        let mut events = rfq_lifecycle("rfq-1", 10);
        events.extend(rfq_lifecycle("rfq-2", 12));
        pipeline.publish(&events);
        pipeline.listener.catch_up().await.unwrap();

        let processor = &pipeline.processor;
        let chain = processor.verify_hash_chain().await.unwrap();
        assert!(chain.valid);
        assert_eq!(chain.total_events, 20);
        assert!(chain.invalid_events.is_empty());

        for rfq_id in ["rfq-1", "rfq-2"] {
            let snapshot = processor.reconstruct_rfq(rfq_id).await.unwrap();
            assert_eq!(snapshot.events_applied, 10);
            assert_eq!(snapshot.status(), RfqStatus::Completed);
            assert_eq!(snapshot.rfq, processor.get_rfq(rfq_id).await.unwrap());
            assert_eq!(snapshot.escrow, processor.get_escrow(rfq_id).await.unwrap());
            assert_eq!(snapshot.payments, processor.get_payments(rfq_id).await.unwrap());
            assert_eq!(snapshot.total_released(), 900);
        }
    }

    #[tokio::test]
    async fn test_replayed_catch_up_is_idempotent() {
        let pipeline = Pipeline::new();
        let events = rfq_lifecycle("rfq-1", 1);
        pipeline.publish(&events);
        pipeline.listener.catch_up().await.unwrap();

        // Everything delivered again through the push path.
        for event in events {
            pipeline.listener.handle_event(event).await;
        }

        let stats = pipeline.listener.stats();
        assert_eq!(stats.events_applied, 10);
        assert_eq!(stats.duplicates, 10);
        assert_eq!(pipeline.processor.ledger_event_count().await.unwrap(), 10);
        assert_eq!(pipeline.processor.get_payments("rfq-1").await.unwrap().len(), 2);
    }

    // =============================================================================
    // REORGANISATION
    // =============================================================================

    #[tokio::test]
    async fn test_replaced_block_rolls_back_and_reapplies() {
        let pipeline = Pipeline::new();
        pipeline.publish(&rfq_lifecycle("rfq-1", 10));
        pipeline.listener.catch_up().await.unwrap();

        // Block 17 is replaced: the final payment lands in a different tx
        // and for a different amount.
        let replacement = {
            let mut event = confirmed(
                "at-rfq-1-final-b",
                "release_final_payment",
                0,
                17,
                json!({ "rfq_id": "rfq-1", "recipient": "aleo1vendor1", "amount": 550 }),
            );
            event.block_hash = "hash-17b".to_string();
            event
        };
        pipeline.ledger.replace_block(17, vec![replacement.clone()]);
        pipeline.listener.handle_event(replacement).await;

        let history = pipeline.processor.reorg_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].fork_height, 16);
        assert_eq!(history[0].detected_height, 17);
        assert_eq!(history[0].old_hash.as_deref(), Some("hash-17"));
        assert_eq!(history[0].events_rolled_back, 1);
        assert_eq!(pipeline.listener.last_processed_block(), 16);
        assert_eq!(pipeline.listener.stats().reorgs, 1);

        let escrow = pipeline.processor.get_escrow("rfq-1").await.unwrap().unwrap();
        assert_eq!(escrow.released_amount, 850);
        assert!(escrow.is_final);
        let rfq = pipeline.processor.get_rfq("rfq-1").await.unwrap().unwrap();
        assert_eq!(rfq.status, RfqStatus::Completed);

        // The next catch-up refetches the fork and finds nothing new.
        let report = pipeline.listener.catch_up().await.unwrap();
        assert_eq!(report.events, 1);
        assert_eq!(pipeline.listener.stats().duplicates, 1);
        assert_eq!(pipeline.listener.last_processed_block(), 17);

        let chain = pipeline.processor.verify_hash_chain().await.unwrap();
        assert!(chain.valid);
        assert_eq!(chain.total_events, 10);
        let checkpoint = pipeline.processor.latest_checkpoint().await.unwrap().unwrap();
        assert_eq!(checkpoint.block_hash, "hash-17b");
    }

    #[tokio::test]
    async fn test_reorg_that_removes_rfq_creation() {
        let pipeline = Pipeline::new();
        pipeline.publish(&rfq_lifecycle("rfq-1", 10));
        pipeline.publish(&rfq_lifecycle("rfq-2", 20));
        pipeline.listener.catch_up().await.unwrap();
        assert!(pipeline.processor.get_rfq("rfq-2").await.unwrap().is_some());

        // Block 20 now holds an unrelated creation.
        let mut other = confirmed(
            "at-rfq-3-create",
            "create_rfq",
            0,
            20,
            json!({
                "rfq_id": "rfq-3",
                "buyer": "aleo1other",
                "bidding_deadline": 30,
                "reveal_deadline": 40,
                "min_bid": 1,
            }),
        );
        other.block_hash = "hash-20b".to_string();
        pipeline.listener.handle_event(other).await;

        let processor = &pipeline.processor;
        assert!(processor.get_rfq("rfq-2").await.unwrap().is_none());
        assert!(processor.get_escrow("rfq-2").await.unwrap().is_none());
        assert!(processor.get_payments("rfq-2").await.unwrap().is_empty());
        assert_eq!(
            processor.get_rfq("rfq-1").await.unwrap().unwrap().status,
            RfqStatus::Completed
        );
        assert!(processor.get_rfq("rfq-3").await.unwrap().is_some());
        assert_eq!(processor.reorg_history().await.unwrap()[0].events_rolled_back, 10);
        assert!(processor.verify_hash_chain().await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_fork_below_finality_is_refused() {
        let pipeline = Pipeline::with_config(
            ProcessorConfig::for_testing(),
            ListenerConfig::for_testing(),
        );
        pipeline.publish(&rfq_lifecycle("rfq-1", 10));
        pipeline.listener.catch_up().await.unwrap();

        let finalized: Vec<_> = pipeline
            .processor
            .checkpoints()
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.finalized)
            .map(|c| c.block_height)
            .collect();
        assert_eq!(finalized, vec![10, 11, 12, 13, 14]);

        let mut forked = rfq_lifecycle("rfq-1", 10).remove(3);
        assert_eq!(forked.block_height, 12);
        forked.block_hash = "hash-12b".to_string();
        pipeline.listener.handle_event(forked).await;

        assert_eq!(pipeline.listener.stats().failed, 1);
        assert!(pipeline.processor.reorg_history().await.unwrap().is_empty());
        assert_eq!(pipeline.processor.ledger_event_count().await.unwrap(), 10);
        assert_eq!(pipeline.listener.last_processed_block(), 17);
        let checkpoints = pipeline.processor.checkpoints().await.unwrap();
        assert!(checkpoints
            .iter()
            .all(|c| c.block_hash == block_hash(c.block_height)));
    }

    // =============================================================================
    // PHANTOM DETECTION
    // =============================================================================

    #[tokio::test]
    async fn test_untracked_execution_reported_as_phantom() {
        let pipeline = Pipeline::new();
        let events = rfq_lifecycle("rfq-1", 10);
        pipeline.publish(&events);
        pipeline.listener.catch_up().await.unwrap();

        let container = SyncContainer::new(&RuntimeConfig::default(), pipeline.clock.clone());
        let tracker = container.tracker.clone();
        // Every execution except the escrow funding went through the tracker.
        for (n, event) in events.iter().enumerate() {
            if event.transition == "fund_escrow" {
                continue;
            }
            let key = format!("idem-{n}");
            tracker
                .prepare(
                    &action(&event.transition, json!([])),
                    &format!("{}:{n}", event.transition),
                    &key,
                    None,
                )
                .await
                .unwrap();
            tracker.mark_submitted(&key, &event.tx_id, None).await.unwrap();
            tracker
                .mark_confirmed(&event.tx_id, event.block_height, &event.block_hash, None)
                .await
                .unwrap();
        }

        let job = ReconciliationJob::new(
            tracker,
            Arc::new(MockChainState::new()),
            Arc::new(ProcessorEventFeed::new(pipeline.processor.clone())),
            pipeline.clock.clone(),
            ReconciliationConfig::for_testing(),
        );
        let report = job.run_once().await;

        assert_eq!(report.phantoms, 1);
        assert_eq!(report.checked, 0);
        let phantom = report
            .details
            .iter()
            .find(|d| d.action == ReconciliationAction::PhantomExecution)
            .unwrap();
        assert_eq!(phantom.external_ref.as_deref(), Some("at-rfq-1-fund"));
        assert!(phantom.idempotency_key.is_none());
    }

    // =============================================================================
    // RUNTIME
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_runtime_syncs_lifecycle_until_shutdown() {
        let ledger = Arc::new(MockLedgerSource::new());
        for event in rfq_lifecycle("rfq-1", 10) {
            ledger.add_event(event);
        }
        ledger.set_latest_block(17);

        let runtime = SyncRuntime::new(
            RuntimeConfig::for_testing(),
            ledger.clone(),
            Arc::new(MockChainState::new()),
            Arc::new(ManualTimeSource::new(GENESIS_MS)),
        );
        runtime.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let processor = runtime.container().processor.clone();
        let rfq = processor.get_rfq("rfq-1").await.unwrap().unwrap();
        assert_eq!(rfq.status, RfqStatus::Completed);
        assert_eq!(runtime.listener().last_processed_block(), 17);

        // Everything on the ledger is untracked by this runtime's tracker.
        let report = runtime.reconciliation().last_report().unwrap();
        assert_eq!(report.checked, 0);

        runtime.shutdown().await.unwrap();
        assert!(!runtime.is_running());
        assert!(runtime.start().await.is_err());
    }
}
