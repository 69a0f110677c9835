//! Transaction safety monitoring against untrusted nodes.
//!
//! Each tracked transaction runs an independent countdown of
//! `safe_tx_delay` while a poll loop asks every untrusted node whether it
//! has observed a conflicting spend of the transaction's inputs. A single
//! corroborating report from any one node flags the transaction
//! `Conflicted` — no quorum is required for the negative case, favoring
//! paranoia over availability. Surviving the window promotes it to
//! `Safe`, which is terminal by design: conflicts surfacing after the
//! window are an accepted risk class, not a bug.
//!
//! Tracked transactions have disjoint state, so there is no
//! cross-transaction locking; each record is protected only against its
//! own countdown-expiry/conflict-report race, which `Conflicted` wins.

use crate::{
    node::NodeClient,
    types::{ConflictReport, OutPoint, SafetyState, TxId},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::time::{interval, sleep_until, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Snapshot of a tracked transaction's monitoring record.
#[derive(Clone, Debug)]
pub struct TrackedRecord {
    /// The transaction under observation.
    pub tx_id: TxId,
    /// When tracking began.
    pub first_seen_at: DateTime<Utc>,
    /// Current safety classification.
    pub state: SafetyState,
    /// The competing transaction id, when a reporter could name it.
    pub conflicting_tx_id: Option<TxId>,
}

struct TrackedTransaction {
    inputs: Vec<OutPoint>,
    first_seen_at: DateTime<Utc>,
    state: SafetyState,
    conflicting_tx_id: Option<TxId>,
    /// Set when the state becomes terminal; drives the retention sweep.
    finalized_at: Option<Instant>,
}

impl TrackedTransaction {
    fn snapshot(&self, tx_id: TxId) -> TrackedRecord {
        TrackedRecord {
            tx_id,
            first_seen_at: self.first_seen_at,
            state: self.state,
            conflicting_tx_id: self.conflicting_tx_id,
        }
    }
}

/// Timing parameters for the monitor.
#[derive(Debug, Clone, Copy)]
pub struct SafetyTiming {
    /// Conflict-free window after which a transaction is declared safe.
    pub safe_tx_delay: Duration,
    /// How often untrusted nodes are polled during the window.
    pub poll_interval: Duration,
    /// Deadline for each individual conflict query.
    pub probe_timeout: Duration,
}

/// Tracks in-flight transactions and resolves each to `Safe` or
/// `Conflicted`.
pub struct SafetyMonitor {
    transactions: DashMap<TxId, TrackedTransaction>,
    untrusted: Vec<Arc<dyn NodeClient>>,
    timing: SafetyTiming,
}

impl SafetyMonitor {
    /// Creates a monitor polling the given untrusted clients.
    ///
    /// With no untrusted nodes configured, the countdown alone governs
    /// promotion; only externally injected reports can flag a conflict.
    #[must_use]
    pub fn new(untrusted: Vec<Arc<dyn NodeClient>>, timing: SafetyTiming) -> Self {
        if untrusted.is_empty() {
            warn!("no untrusted nodes configured, conflict polling disabled");
        }
        Self { transactions: DashMap::new(), untrusted, timing }
    }

    /// Begins monitoring a transaction and returns its handle (the id
    /// itself). A transaction already under observation is not restarted.
    pub fn track(self: &Arc<Self>, tx_id: TxId, inputs: Vec<OutPoint>) -> TxId {
        let mut fresh = false;
        self.transactions.entry(tx_id).or_insert_with(|| {
            fresh = true;
            TrackedTransaction {
                inputs: inputs.clone(),
                first_seen_at: Utc::now(),
                state: SafetyState::Pending,
                conflicting_tx_id: None,
                finalized_at: None,
            }
        });

        if fresh {
            info!(tx = %tx_id, inputs = inputs.len(), delay_secs = self.timing.safe_tx_delay.as_secs(), "tracking transaction");
            let monitor = Arc::clone(self);
            tokio::spawn(async move {
                monitor.monitor_until_resolved(tx_id, inputs).await;
            });
        }
        tx_id
    }

    /// Current safety state of a tracked transaction.
    #[must_use]
    pub fn state(&self, tx_id: TxId) -> Option<SafetyState> {
        self.transactions.get(&tx_id).map(|r| r.state)
    }

    /// Snapshot of a tracked transaction's full record.
    #[must_use]
    pub fn record(&self, tx_id: TxId) -> Option<TrackedRecord> {
        self.transactions.get(&tx_id).map(|r| r.snapshot(tx_id))
    }

    /// Removes and returns the record if it has reached a terminal state.
    /// Pending transactions stay tracked.
    pub fn take_if_final(&self, tx_id: TxId) -> Option<TrackedRecord> {
        self.transactions
            .remove_if(&tx_id, |_, record| record.state.is_terminal())
            .map(|(id, record)| record.snapshot(id))
    }

    /// Injects a conflict observation from an external source (e.g. a
    /// push notification that can name the competing transaction).
    ///
    /// Returns `true` if the transaction transitioned to `Conflicted`.
    pub fn report_conflict(&self, tx_id: TxId, report: &ConflictReport) -> bool {
        self.apply_conflict(tx_id, report)
    }

    /// Number of transactions currently tracked, terminal ones included.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.transactions.len()
    }

    /// Drops terminal records older than `retention`. Returns how many
    /// were removed.
    pub fn sweep(&self, retention: Duration) -> usize {
        // `track` may insert concurrently with the shard walk, so removals
        // are counted directly instead of derived from a length delta.
        let removed = AtomicUsize::new(0);
        self.transactions.retain(|_, record| match record.finalized_at {
            Some(finalized_at) => {
                let keep = finalized_at.elapsed() < retention;
                if !keep {
                    removed.fetch_add(1, Ordering::Relaxed);
                }
                keep
            }
            None => true,
        });
        let removed = removed.into_inner();
        if removed > 0 {
            debug!(removed, remaining = self.transactions.len(), "swept resolved transactions");
        }
        removed
    }

    async fn monitor_until_resolved(self: Arc<Self>, tx_id: TxId, inputs: Vec<OutPoint>) {
        let deadline = tokio::time::Instant::now() + self.timing.safe_tx_delay;
        let mut poll = interval(self.timing.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // When a poll tick and the countdown expire together, the
                // poll runs first: Conflicted wins over Safe.
                biased;

                _ = poll.tick() => {
                    match self.state(tx_id) {
                        Some(SafetyState::Pending) => {}
                        // Resolved externally or untracked; stop polling.
                        _ => break,
                    }
                    if let Some(report) = self.poll_untrusted(tx_id, &inputs).await {
                        self.apply_conflict(tx_id, &report);
                        break;
                    }
                }
                _ = sleep_until(deadline) => {
                    self.promote_to_safe(tx_id);
                    break;
                }
            }
        }
    }

    /// Queries every untrusted node concurrently; the first corroborating
    /// report wins. Query failures are recovered locally — a node that
    /// cannot answer simply contributes nothing this round.
    async fn poll_untrusted(&self, tx_id: TxId, inputs: &[OutPoint]) -> Option<ConflictReport> {
        if self.untrusted.is_empty() {
            return None;
        }

        let queries = self.untrusted.iter().map(|client| {
            let client = Arc::clone(client);
            let probe_timeout = self.timing.probe_timeout;
            async move {
                match client.check_conflicts(tx_id, inputs, probe_timeout).await {
                    Ok(report) => report,
                    Err(error) => {
                        debug!(node = %client.name(), error = %error, "conflict query failed");
                        None
                    }
                }
            }
        });

        join_all(queries).await.into_iter().flatten().next()
    }

    fn promote_to_safe(&self, tx_id: TxId) {
        if let Some(mut record) = self.transactions.get_mut(&tx_id) {
            if record.state == SafetyState::Pending {
                record.state = SafetyState::Safe;
                record.finalized_at = Some(Instant::now());
                info!(tx = %tx_id, "transaction declared safe");
            }
        }
    }

    fn apply_conflict(&self, tx_id: TxId, report: &ConflictReport) -> bool {
        let Some(mut record) = self.transactions.get_mut(&tx_id) else {
            return false;
        };
        // Pending is the only state that can transition; Safe and
        // Conflicted are both terminal.
        if record.state != SafetyState::Pending {
            return false;
        }
        record.state = SafetyState::Conflicted;
        record.conflicting_tx_id = report.conflicting_tx_id;
        record.finalized_at = Some(Instant::now());
        warn!(
            tx = %tx_id,
            reported_by = %report.reported_by,
            conflicting = ?report.conflicting_tx_id,
            "transaction conflicted"
        );
        true
    }
}
