//! Shotgun transaction broadcast.
//!
//! A broadcast submits the same raw transaction to several distinct nodes
//! in parallel to maximize propagation odds while tolerating individual
//! node failure. Each submission retries transient failures under the
//! shared retry policy; deterministic rejections are never retried. The
//! round succeeds if at least one endpoint accepts.

use crate::{
    node::{NodeClient, NodeError, TrackerError},
    retry::{retry_with_policy, RetryPolicy},
    types::{AttemptOutcome, BroadcastAttempt, BroadcastResult, TxId},
};
use bytes::Bytes;
use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, warn};

fn outcome_from_error(error: &NodeError) -> AttemptOutcome {
    match error {
        NodeError::Timeout => AttemptOutcome::TimedOut,
        NodeError::Rejected(reason) => AttemptOutcome::Rejected(reason.clone()),
        NodeError::Unreachable(detail) => AttemptOutcome::Unreachable(detail.clone()),
        NodeError::MalformedResponse(detail) => {
            AttemptOutcome::Unreachable(format!("malformed response: {detail}"))
        }
    }
}

/// Broadcasts transactions to `shotgun_count` distinct endpoints in
/// parallel.
pub struct BroadcastMultiplexer {
    clients: Vec<Arc<dyn NodeClient>>,
    shotgun_count: usize,
    policy: RetryPolicy,
    submit_timeout: Duration,
}

impl BroadcastMultiplexer {
    /// Creates a multiplexer over the given clients.
    ///
    /// Endpoints are taken in configured order; when fewer than
    /// `shotgun_count` are available, all of them are used.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NoEndpoints`] for an empty client list and
    /// [`TrackerError::InvalidConfig`] for a zero shotgun count.
    pub fn new(
        clients: Vec<Arc<dyn NodeClient>>,
        shotgun_count: usize,
        policy: RetryPolicy,
        submit_timeout: Duration,
    ) -> Result<Self, TrackerError> {
        if clients.is_empty() {
            return Err(TrackerError::NoEndpoints);
        }
        if shotgun_count == 0 {
            return Err(TrackerError::InvalidConfig(
                "shotgun count must be at least 1".to_string(),
            ));
        }
        Ok(Self { clients, shotgun_count, policy, submit_timeout })
    }

    /// Submits `raw_tx` to up to `shotgun_count` endpoints concurrently
    /// and reports the aggregate outcome with full attempt history.
    pub async fn broadcast(&self, tx_id: TxId, raw_tx: Bytes) -> BroadcastResult {
        let targets = &self.clients[..self.shotgun_count.min(self.clients.len())];
        debug!(tx = %tx_id, endpoints = targets.len(), "broadcasting transaction");

        let submissions = targets.iter().map(|client| {
            let client = Arc::clone(client);
            let raw_tx = raw_tx.clone();
            let policy = self.policy;
            let submit_timeout = self.submit_timeout;
            async move {
                let endpoint = client.name();
                let outcome = retry_with_policy(policy, NodeError::is_retryable, || {
                    let client = Arc::clone(&client);
                    // Bytes clones are reference-counted, so retries do
                    // not copy the payload.
                    let raw_tx = raw_tx.clone();
                    async move {
                        // The outer timeout bounds the attempt even if the
                        // client ignores its deadline.
                        match timeout(submit_timeout, client.submit_tx(raw_tx, submit_timeout))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(NodeError::Timeout),
                        }
                    }
                })
                .await;

                let mut attempts = Vec::with_capacity(outcome.failures.len() + 1);
                for (index, failure) in outcome.failures.iter().enumerate() {
                    attempts.push(BroadcastAttempt {
                        endpoint: Arc::clone(&endpoint),
                        tx_id,
                        outcome: outcome_from_error(failure),
                        attempt_number: u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1),
                    });
                }
                let final_outcome = match &outcome.result {
                    Ok(_) => AttemptOutcome::Accepted,
                    Err(error) => outcome_from_error(error),
                };
                attempts.push(BroadcastAttempt {
                    endpoint,
                    tx_id,
                    outcome: final_outcome,
                    attempt_number: outcome.attempts(),
                });
                attempts
            }
        });

        let attempts: Vec<BroadcastAttempt> =
            join_all(submissions).await.into_iter().flatten().collect();

        let accepted = attempts.iter().any(|a| a.outcome == AttemptOutcome::Accepted);
        if accepted {
            info!(
                tx = %tx_id,
                accepted_by = attempts
                    .iter()
                    .filter(|a| a.outcome == AttemptOutcome::Accepted)
                    .count(),
                "broadcast accepted"
            );
        } else {
            warn!(tx = %tx_id, attempts = attempts.len(), "broadcast failed on every endpoint");
        }

        BroadcastResult { accepted, attempts }
    }
}
