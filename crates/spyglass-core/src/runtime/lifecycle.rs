//! Runtime lifecycle management including background tasks and graceful shutdown.

use crate::{
    broadcast::BroadcastMultiplexer,
    config::AppConfig,
    node::TrackerError,
    safety::{SafetyMonitor, TrackedRecord},
    scheduler::TipNotifier,
    tip::TipCache,
    types::{BroadcastResult, ChainTip, ConflictReport, OutPoint, SafetyState, TxId},
};
use bytes::Bytes;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use super::builder::TrackerBuilder;

/// Main runtime container managing component lifecycles and background
/// tasks.
///
/// Owns all initialized components and their background tasks, providing
/// graceful shutdown coordination via a broadcast channel. When
/// `shutdown()` is called, all background tasks are signaled and awaited
/// for completion.
pub struct Tracker {
    config: AppConfig,
    cache: Arc<TipCache>,
    safety: Arc<SafetyMonitor>,
    broadcaster: Arc<BroadcastMultiplexer>,
    notifier: TipNotifier,
    shutdown_tx: broadcast::Sender<()>,
    scheduler_task: JoinHandle<()>,
    sweep_task: JoinHandle<()>,
}

impl Tracker {
    /// Creates a new builder for constructing a `Tracker`.
    ///
    /// This is the recommended way to create a tracker instance.
    #[must_use]
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    /// Creates the tracker from initialized components and starts the
    /// remaining background tasks.
    ///
    /// Called by [`TrackerBuilder`] during initialization.
    pub(super) fn new(
        config: AppConfig,
        cache: Arc<TipCache>,
        safety: Arc<SafetyMonitor>,
        broadcaster: Arc<BroadcastMultiplexer>,
        notifier: TipNotifier,
        shutdown_tx: broadcast::Sender<()>,
        scheduler_task: JoinHandle<()>,
    ) -> Self {
        let sweep_task = Self::start_retention_sweep(
            Arc::clone(&safety),
            config.retention(),
            shutdown_tx.subscribe(),
        );

        Self { config, cache, safety, broadcaster, notifier, shutdown_tx, scheduler_task, sweep_task }
    }

    /// Returns a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the last resolved consensus tip.
    ///
    /// This is a cache read; it never performs network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::TipUnavailable`] before the first
    /// successful aggregation round.
    pub fn current_tip(&self) -> Result<ChainTip, TrackerError> {
        self.cache.current().ok_or(TrackerError::TipUnavailable)
    }

    /// Seconds since the cached tip was last refreshed.
    #[must_use]
    pub fn tip_age(&self) -> Duration {
        self.cache.age()
    }

    /// Handle for pushing new-block notifications into the refresh
    /// scheduler.
    #[must_use]
    pub fn notifier(&self) -> TipNotifier {
        self.notifier.clone()
    }

    /// Begins safety monitoring for a transaction. Returns the handle
    /// (the transaction id itself) for later state queries.
    pub fn track_transaction(&self, tx_id: TxId, inputs: Vec<OutPoint>) -> TxId {
        self.safety.track(tx_id, inputs)
    }

    /// Current safety classification of a tracked transaction, or `None`
    /// if it is unknown (never tracked, or already swept).
    #[must_use]
    pub fn safety_state(&self, tx_id: TxId) -> Option<SafetyState> {
        self.safety.state(tx_id)
    }

    /// Full monitoring record of a tracked transaction.
    #[must_use]
    pub fn safety_record(&self, tx_id: TxId) -> Option<TrackedRecord> {
        self.safety.record(tx_id)
    }

    /// Removes and returns a transaction's record once it has resolved.
    /// Pending transactions are left in place.
    #[must_use]
    pub fn take_if_final(&self, tx_id: TxId) -> Option<TrackedRecord> {
        self.safety.take_if_final(tx_id)
    }

    /// Injects an externally observed conflict (e.g. from a peer message
    /// handler) for a tracked transaction.
    pub fn report_conflict(&self, tx_id: TxId, report: &ConflictReport) -> bool {
        self.safety.report_conflict(tx_id, report)
    }

    /// Broadcasts a raw transaction to the configured shotgun set and
    /// returns the aggregate outcome with full attempt history.
    pub async fn broadcast(&self, tx_id: TxId, raw_tx: Bytes) -> BroadcastResult {
        self.broadcaster.broadcast(tx_id, raw_tx).await
    }

    /// Creates a new shutdown receiver for external shutdown coordination.
    ///
    /// Useful for listening to shutdown signals in custom background tasks.
    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates graceful shutdown of all background tasks.
    ///
    /// Broadcasts the shutdown signal and waits for the scheduler and
    /// sweep tasks to complete.
    pub async fn shutdown(self) {
        info!("Initiating tracker shutdown");
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!(error = %e, "Failed to send shutdown signal (no receivers)");
        }

        for (name, task) in [("scheduler", self.scheduler_task), ("sweep", self.sweep_task)] {
            match task.await {
                Ok(()) => debug!(task = name, "Background task completed"),
                Err(e) if e.is_cancelled() => debug!(task = name, "Background task cancelled"),
                Err(e) => error!(task = name, error = %e, "Background task failed"),
            }
        }

        info!("Tracker shutdown complete");
    }

    /// Waits indefinitely for a shutdown signal, then performs cleanup.
    ///
    /// Useful for embedding applications that keep the tracker alive while
    /// waiting for external shutdown signals (SIGTERM, Ctrl+C, etc.).
    pub async fn wait_for_shutdown(self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let _ = shutdown_rx.recv().await;
        info!("Shutdown signal received, tracker terminating");
        self.shutdown().await;
    }

    /// Periodically drops resolved safety records older than the
    /// retention window.
    fn start_retention_sweep(
        safety: Arc<SafetyMonitor>,
        retention: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // Sweeping twice per window keeps worst-case overstay bounded
            // without ticking constantly.
            let period = (retention / 2).max(Duration::from_secs(1));
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let swept = safety.sweep(retention);
                        if swept > 0 {
                            debug!(swept, "Swept resolved safety records");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Retention sweep shutting down");
                        break;
                    }
                }
            }
        })
    }
}
