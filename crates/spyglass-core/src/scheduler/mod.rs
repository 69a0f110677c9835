//! Refresh scheduling: periodic timer plus push notifications.
//!
//! Two producers feed one consumer loop: a repeating interval tick and a
//! new-block notification channel. Notification bursts are coalesced —
//! the channel is drained before each refresh, so a burst triggers one
//! aggregation, not one per notification. The timer always fires
//! regardless, so the cache never goes stale longer than the configured
//! interval even when the notification source is silent or disconnected.

use crate::{
    consensus::TipAggregator,
    node::TrackerError,
    storage::HeaderStore,
    tip::TipCache,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, mpsc},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// Handle for pushing new-block notifications into the scheduler.
///
/// Cloneable and cheap; wire it to whatever event source exists (ZMQ
/// bridge, peer message handler). Dropping every notifier degrades the
/// scheduler to timer-only mode.
#[derive(Clone)]
pub struct TipNotifier {
    tx: mpsc::UnboundedSender<()>,
}

impl TipNotifier {
    /// Signals that a new block was announced. Never blocks.
    pub fn notify_new_block(&self) {
        // A send failure means the scheduler has shut down; nothing to do.
        let _ = self.tx.send(());
    }
}

/// Drives aggregation rounds into the tip cache.
pub struct RefreshScheduler {
    aggregator: Arc<TipAggregator>,
    cache: Arc<TipCache>,
    header_store: Option<Arc<dyn HeaderStore>>,
    refresh_interval: Duration,
    push_available: bool,
    notifications: mpsc::UnboundedReceiver<()>,
}

impl RefreshScheduler {
    /// Creates a scheduler and the notifier handle that feeds it.
    ///
    /// `push_available` records whether any notification source was
    /// reachable at startup; when false, the degraded timer-only mode is
    /// logged once. This is a soft failure, never fatal.
    #[must_use]
    pub fn new(
        aggregator: Arc<TipAggregator>,
        cache: Arc<TipCache>,
        refresh_interval: Duration,
        push_available: bool,
    ) -> (Self, TipNotifier) {
        let (tx, notifications) = mpsc::unbounded_channel();
        let scheduler = Self {
            aggregator,
            cache,
            header_store: None,
            refresh_interval,
            push_available,
            notifications,
        };
        (scheduler, TipNotifier { tx })
    }

    /// Attaches the header-storage collaborator. Accepted tips are
    /// persisted by height after each cache write.
    #[must_use]
    pub fn with_header_store(mut self, store: Arc<dyn HeaderStore>) -> Self {
        self.header_store = Some(store);
        self
    }

    /// Spawns the scheduler loop. The task exits when `shutdown_rx`
    /// fires.
    #[must_use]
    pub fn start_with_shutdown(
        mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        if !self.push_available {
            warn!(
                interval_secs = self.refresh_interval.as_secs(),
                "no new-block notification source reachable, relying on timer only"
            );
        }

        tokio::spawn(async move {
            let mut ticker = interval(self.refresh_interval);
            // A refresh slower than the interval must not cause a
            // catch-up burst of ticks afterwards.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut push_closed = false;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.refresh("timer").await;
                    }
                    received = self.notifications.recv(), if !push_closed => {
                        match received {
                            Some(()) => {
                                // Drain the burst: everything queued during
                                // this processing pass collapses into one
                                // aggregation.
                                let mut coalesced = 0usize;
                                while self.notifications.try_recv().is_ok() {
                                    coalesced += 1;
                                }
                                if coalesced > 0 {
                                    debug!(coalesced, "coalesced notification burst");
                                }
                                self.refresh("notification").await;
                            }
                            None => {
                                warn!("notification channel closed, continuing timer-only");
                                push_closed = true;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("refresh scheduler shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Runs one aggregation round and applies the result to the cache.
    async fn refresh(&self, trigger: &'static str) {
        match self.aggregator.aggregate().await {
            Ok(round) => {
                let tip = round.selected;
                let written = self.cache.write(tip).await;
                debug!(
                    trigger,
                    height = tip.height,
                    responding = round.responding_count(),
                    written,
                    "refresh complete"
                );
                if written {
                    if let Some(store) = &self.header_store {
                        if let Err(e) = store.put(tip.height, tip.hash.as_bytes()).await {
                            error!(height = tip.height, error = %e, "failed to persist header");
                        }
                    }
                }
            }
            Err(TrackerError::NoQuorum { attempted }) => {
                // The cache keeps serving its last-known tip; its age
                // keeps growing until a round succeeds.
                warn!(
                    trigger,
                    attempted,
                    cache_age_secs = self.cache.age_seconds(),
                    "refresh failed, serving cached tip"
                );
            }
            Err(e) => {
                error!(trigger, error = %e, "refresh failed");
            }
        }
    }
}
