//! # Cross-Subsystem Properties
//!
//! Quantified checks over the wired subsystems, driven by `proptest`.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{action, rfq_lifecycle, Pipeline, GENESIS_MS};
    use ls_01_nonce_manager::{NonceAction, NonceManagerApi};
    use ls_02_tx_tracker::{ErrorClass, Rejection, TransactionTrackerApi, TxStatus};
    use ls_03_event_processor::{EventProcessorApi, ProcessorConfig, RfqStatus};
    use ls_04_event_listener::{EventListenerApi, ListenerConfig};
    use proptest::prelude::*;
    use serde_json::json;
    use shared_types::ManualTimeSource;
    use std::sync::Arc;
    use sync_runtime::{RuntimeConfig, SyncContainer};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Clone, Copy, Debug)]
    enum Move {
        Submit,
        Confirm,
        Reject,
        Expire,
    }

    impl Move {
        fn target(self) -> TxStatus {
            match self {
                Move::Submit => TxStatus::Submitted,
                Move::Confirm => TxStatus::Confirmed,
                Move::Reject => TxStatus::Rejected,
                Move::Expire => TxStatus::Expired,
            }
        }
    }

    fn any_move() -> impl Strategy<Value = Move> {
        prop_oneof![
            Just(Move::Submit),
            Just(Move::Confirm),
            Just(Move::Reject),
            Just(Move::Expire),
        ]
    }

    fn edge(from: TxStatus, to: TxStatus) -> bool {
        matches!(
            (from, to),
            (TxStatus::Prepared, TxStatus::Submitted)
                | (TxStatus::Prepared, TxStatus::Expired)
                | (TxStatus::Submitted, TxStatus::Confirmed)
                | (TxStatus::Submitted, TxStatus::Rejected)
                | (TxStatus::Submitted, TxStatus::Expired)
        )
    }

    fn container() -> SyncContainer {
        SyncContainer::new(
            &RuntimeConfig::default(),
            Arc::new(ManualTimeSource::new(GENESIS_MS)),
        )
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(future)
    }

    // =============================================================================
    // PROPERTIES
    // =============================================================================

    proptest! {
        /// Only table edges are ever taken; refused moves leave the record as it was.
        #[test]
        fn prop_tracker_follows_state_table(moves in prop::collection::vec(any_move(), 1..12)) {
            let (history, expected) = block_on(async {
                let c = container();
                let tracker = &c.tracker;
                tracker
                    .prepare(&action("create_rfq", json!([])), "create_rfq:p", "idem-p", None)
                    .await
                    .unwrap();

                let mut status = TxStatus::Prepared;
                let mut expected = vec![TxStatus::Prepared];
                for m in &moves {
                    let before = tracker.get_by_idempotency_key("idem-p").await.unwrap().unwrap();
                    let result = match m {
                        Move::Submit => tracker.mark_submitted("idem-p", "ext-p", None).await,
                        Move::Confirm => tracker.mark_confirmed("ext-p", 9, "hash-9", None).await,
                        Move::Reject => {
                            tracker
                                .mark_rejected(
                                    "idem-p",
                                    Rejection::new("refused", 1, Some(ErrorClass::Logical)),
                                    None,
                                )
                                .await
                        }
                        Move::Expire => tracker.mark_expired("idem-p").await,
                    };
                    let after = tracker.get_by_idempotency_key("idem-p").await.unwrap().unwrap();
                    if edge(status, m.target()) {
                        assert!(result.is_ok(), "{status} -> {:?} refused", m);
                        status = m.target();
                        expected.push(status);
                    } else {
                        assert!(result.is_err(), "{status} -> {:?} accepted", m);
                        assert_eq!(before, after);
                    }
                    assert_eq!(after.status, status);
                }
                let record = tracker.get_by_idempotency_key("idem-p").await.unwrap().unwrap();
                let history: Vec<TxStatus> =
                    record.status_history.iter().map(|s| s.status).collect();
                (history, expected)
            });
            prop_assert_eq!(history, expected);
        }

        /// The stored nonce equals the number of confirmed attempts, no matter
        /// how many rejections or replayed confirmations happen in between.
        #[test]
        fn prop_nonce_counts_confirmed_attempts(
            outcomes in prop::collection::vec((any::<bool>(), any::<bool>()), 1..16)
        ) {
            let confirms = outcomes.iter().filter(|(confirm, _)| *confirm).count() as u64;
            let stored = block_on(async {
                let c = container();
                for (i, (confirm, replay)) in outcomes.iter().enumerate() {
                    let key = format!("idem-{i}");
                    let nonce = c
                        .nonce_manager
                        .get_next_nonce("vendor", NonceAction::Reveal)
                        .await
                        .unwrap();
                    c.tracker
                        .prepare(
                            &action("reveal_bid", json!([nonce.to_string()])),
                            &format!("reveal_bid:{i}"),
                            &key,
                            None,
                        )
                        .await
                        .unwrap();
                    c.tracker.mark_submitted(&key, &format!("at-{i}"), None).await.unwrap();

                    if *confirm {
                        c.tracker
                            .mark_confirmed(&format!("at-{i}"), i as u64, "h", None)
                            .await
                            .unwrap();
                        let consumed = c
                            .nonce_manager
                            .increment_confirmed("vendor", NonceAction::Reveal, &key)
                            .await
                            .unwrap();
                        assert_eq!(consumed, Some(nonce));
                        if *replay {
                            let again = c
                                .nonce_manager
                                .increment_confirmed("vendor", NonceAction::Reveal, &key)
                                .await
                                .unwrap();
                            assert_eq!(again, None);
                        }
                    } else {
                        c.tracker
                            .mark_rejected(&key, Rejection::new("bad nonce", 3, None), None)
                            .await
                            .unwrap();
                    }
                }
                c.nonce_manager
                    .current_nonce("vendor", NonceAction::Reveal)
                    .await
                    .unwrap()
            });
            prop_assert_eq!(stored, confirms);
        }

        /// Batch size changes the number of fetches, never the projected state.
        #[test]
        fn prop_catch_up_independent_of_batch_size(batch_size in 1u64..12) {
            let (status, events, requests, hash_chain_valid) = block_on(async {
                let pipeline = Pipeline::with_config(
                    ProcessorConfig::default(),
                    ListenerConfig {
                        batch_size,
                        ..ListenerConfig::for_testing()
                    },
                );
                pipeline.publish(&rfq_lifecycle("rfq-1", 1));
                pipeline.listener.catch_up().await.unwrap();
                let rfq = pipeline.processor.get_rfq("rfq-1").await.unwrap().unwrap();
                (
                    rfq.status,
                    pipeline.processor.ledger_event_count().await.unwrap(),
                    pipeline.ledger.requests().len() as u64,
                    pipeline.processor.verify_hash_chain().await.unwrap().valid,
                )
            });
            prop_assert_eq!(status, RfqStatus::Completed);
            prop_assert_eq!(events, 10);
            prop_assert_eq!(requests, 8u64.div_ceil(batch_size));
            prop_assert!(hash_chain_valid);
        }
    }
}
