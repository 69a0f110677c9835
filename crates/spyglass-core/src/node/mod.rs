//! Node endpoints and the probe/submit seam.
//!
//! [`NodeClient`] is the narrow contract the rest of the crate consumes:
//! one RPC call per invocation, a bounded deadline, a typed result or a
//! classified [`NodeError`]. No retry happens at this layer; retry policy
//! belongs to the caller.

pub mod errors;
pub mod http_client;

pub use errors::{NodeError, TrackerError};
pub use http_client::HttpNodeClient;

use crate::types::{ChainTip, ConflictReport, OutPoint, TxId};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

/// Address and credentials for one full-node RPC connection.
///
/// Immutable after configuration load; owned by the client that dials it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEndpoint {
    /// Human-readable identifier for logs and attempt histories.
    pub name: String,

    /// RPC URL, e.g. `http://10.0.0.1:8332`.
    pub url: String,

    /// Optional basic-auth username.
    #[serde(default)]
    pub username: Option<String>,

    /// Optional basic-auth password.
    #[serde(default)]
    pub password: Option<String>,

    /// Whether this endpoint is consulted as an untrusted corroborator
    /// for conflict detection. Untrusted nodes are never authoritative
    /// for consensus state.
    #[serde(default)]
    pub untrusted: bool,
}

/// One RPC/peer call against a single endpoint.
///
/// Implementations must be safe to invoke concurrently from many callers:
/// no shared mutable state beyond the transport handle, which must itself
/// tolerate concurrent use.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Endpoint identifier used in logs, attempt histories, and conflict
    /// reports.
    fn name(&self) -> Arc<str>;

    /// Fetches the node's current best chain tip.
    async fn probe_tip(&self, deadline: Duration) -> Result<ChainTip, NodeError>;

    /// Submits a raw transaction to the node's mempool.
    ///
    /// Returns the transaction id the node acknowledged. A deterministic
    /// policy refusal comes back as [`NodeError::Rejected`] and must not
    /// be retried.
    async fn submit_tx(&self, raw_tx: Bytes, deadline: Duration) -> Result<TxId, NodeError>;

    /// Asks the node whether any transaction spending `inputs` with an id
    /// other than `tx_id` has been observed.
    ///
    /// `Ok(None)` means no conflict from this node's point of view. A
    /// single `Some` report from any one untrusted node is sufficient to
    /// flag the tracked transaction as conflicted.
    async fn check_conflicts(
        &self,
        tx_id: TxId,
        inputs: &[OutPoint],
        deadline: Duration,
    ) -> Result<Option<ConflictReport>, NodeError>;
}
