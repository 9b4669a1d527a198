//! # Sync Runtime
//!
//! Owns the container and the two long-lived tasks.
//!
//! ## Startup Sequence
//!
//! 1. Build the container (stores, tracker, processor)
//! 2. Build the listener over the ledger event source
//! 3. Build the reconciliation job over the ledger state source
//! 4. `start()` spawns both tasks on one shutdown channel
//!
//! ## Shutdown Sequence
//!
//! 1. Flip the shutdown channel
//! 2. Each task finishes its in-flight batch or pass and returns
//! 3. Join both tasks, bounded by `shutdown_timeout`

use crate::adapters::ProcessorEventFeed;
use crate::container::{ConcreteProcessor, ConcreteTracker, RuntimeConfig, SyncContainer};
use anyhow::{bail, Result};
use ls_04_event_listener::{EventListener, LedgerEventSource};
use ls_05_reconciliation::{ChainStateSource, ReconciliationJob};
use parking_lot::Mutex;
use shared_types::TimeSource;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Event listener over the concrete processor.
pub type ConcreteListener<L> = EventListener<ConcreteProcessor, L>;

/// Reconciliation job over the concrete tracker and the processor's log.
pub type ConcreteReconciliation<C> =
    ReconciliationJob<ConcreteTracker, C, ProcessorEventFeed<ConcreteProcessor>>;

/// The Ledger-Sync runtime.
pub struct SyncRuntime<L, C>
where
    L: LedgerEventSource + 'static,
    C: ChainStateSource + 'static,
{
    container: Arc<SyncContainer>,
    listener: Arc<ConcreteListener<L>>,
    reconciliation: Arc<ConcreteReconciliation<C>>,
    config: RuntimeConfig,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl<L, C> SyncRuntime<L, C>
where
    L: LedgerEventSource + 'static,
    C: ChainStateSource + 'static,
{
    pub fn new(
        config: RuntimeConfig,
        ledger: Arc<L>,
        chain: Arc<C>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        info!("Creating Ledger-Sync runtime");

        let container = Arc::new(SyncContainer::new(&config, Arc::clone(&clock)));

        info!("Initializing Level 2: Event Listener, Reconciliation");
        let listener = Arc::new(EventListener::new(
            Arc::clone(&container.processor),
            ledger,
            config.listener.clone(),
        ));
        let reconciliation = Arc::new(ReconciliationJob::new(
            Arc::clone(&container.tracker),
            chain,
            Arc::new(ProcessorEventFeed::new(Arc::clone(&container.processor))),
            clock,
            config.reconciliation.clone(),
        ));

        let (shutdown_tx, _) = watch::channel(false);

        Self {
            container,
            listener,
            reconciliation,
            config,
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the listener loop and the reconciliation scheduler.
    pub async fn start(&self) -> Result<()> {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            bail!("runtime already started");
        }
        if *self.shutdown_tx.borrow() {
            bail!("runtime has been shut down");
        }

        let listener = Arc::clone(&self.listener);
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push((
            "ls-04-event-listener",
            tokio::spawn(async move {
                if let Err(e) = listener.run(shutdown).await {
                    error!(error = %e, "[ls-04] Event listener stopped with error");
                }
            }),
        ));

        let reconciliation = Arc::clone(&self.reconciliation);
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push((
            "ls-05-reconciliation",
            tokio::spawn(async move { reconciliation.run(shutdown).await }),
        ));

        info!(
            batch_size = self.config.listener.batch_size,
            poll_interval_ms = self.config.listener.poll_interval.as_millis() as u64,
            reconcile_interval_secs = self.config.reconciliation.interval.as_secs(),
            "Ledger-Sync runtime started"
        );
        Ok(())
    }

    /// Signal both tasks and wait for them to finish.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Initiating graceful shutdown...");
        self.shutdown_tx.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut stuck = Vec::new();
        for (name, handle) in tasks {
            match tokio::time::timeout(self.config.shutdown_timeout, handle).await {
                Ok(Ok(())) => info!(task = name, "Task stopped"),
                Ok(Err(e)) => error!(task = name, error = %e, "Task aborted"),
                Err(_) => {
                    warn!(task = name, "Task did not stop in time");
                    stuck.push(name);
                }
            }
        }

        if !stuck.is_empty() {
            bail!("tasks did not stop within {:?}: {}", self.config.shutdown_timeout, stuck.join(", "));
        }
        info!("Shutdown complete");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.lock().is_empty()
    }

    pub fn container(&self) -> Arc<SyncContainer> {
        Arc::clone(&self.container)
    }

    pub fn listener(&self) -> Arc<ConcreteListener<L>> {
        Arc::clone(&self.listener)
    }

    pub fn reconciliation(&self) -> Arc<ConcreteReconciliation<C>> {
        Arc::clone(&self.reconciliation)
    }
}
