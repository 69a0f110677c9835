//! Fan-out/fan-in tip aggregation.

use super::{select::select_tip, AggregationRound, ProbeOutcome};
use crate::node::{NodeClient, NodeError, TrackerError};
use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Probes every configured node in parallel and resolves the group's
/// best-known chain tip.
///
/// Each probe carries its own deadline, so the round's ceiling is the
/// slowest individual probe timeout, never the sum. Per-node failures are
/// recovered locally; only an empty success set surfaces as
/// [`TrackerError::NoQuorum`].
pub struct TipAggregator {
    clients: Vec<Arc<dyn NodeClient>>,
    probe_timeout: Duration,
}

impl TipAggregator {
    /// Creates an aggregator over the given clients.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NoEndpoints`] if `clients` is empty —
    /// an aggregator with nothing to probe can never produce a tip.
    pub fn new(
        clients: Vec<Arc<dyn NodeClient>>,
        probe_timeout: Duration,
    ) -> Result<Self, TrackerError> {
        if clients.is_empty() {
            return Err(TrackerError::NoEndpoints);
        }
        Ok(Self { clients, probe_timeout })
    }

    /// Number of endpoints this aggregator probes per round.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.clients.len()
    }

    /// Runs one aggregation round.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NoQuorum`] when every probe failed. The
    /// caller keeps serving its cached tip in that case.
    pub async fn aggregate(&self) -> Result<AggregationRound, TrackerError> {
        let start = Instant::now();

        let probes = self.clients.iter().map(|client| {
            let client = Arc::clone(client);
            let probe_timeout = self.probe_timeout;
            async move {
                let endpoint = client.name();
                // The outer timeout bounds the whole probe even if the
                // client implementation mishandles its own deadline.
                let result = match timeout(probe_timeout, client.probe_tip(probe_timeout)).await {
                    Ok(inner) => inner,
                    Err(_) => Err(NodeError::Timeout),
                };
                ProbeOutcome { endpoint, result }
            }
        });

        let responses: Vec<ProbeOutcome> = join_all(probes).await;

        for outcome in &responses {
            if let Err(error) = &outcome.result {
                debug!(
                    endpoint = %outcome.endpoint,
                    error = %error,
                    kind = error.as_str(),
                    "probe failed, continuing with remaining nodes"
                );
            }
        }

        let successes: Vec<(Arc<str>, crate::types::ChainTip)> = responses
            .iter()
            .filter_map(|outcome| {
                outcome.result.as_ref().ok().map(|tip| (Arc::clone(&outcome.endpoint), *tip))
            })
            .collect();

        let Some(selected) = select_tip(&successes) else {
            warn!(attempted = responses.len(), "aggregation round produced no quorum");
            return Err(TrackerError::NoQuorum { attempted: responses.len() });
        };

        let duration = start.elapsed();
        debug!(
            height = selected.height,
            hash = %selected.hash,
            responding = successes.len(),
            attempted = responses.len(),
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "aggregation round resolved"
        );

        Ok(AggregationRound { selected, responses, duration })
    }
}
