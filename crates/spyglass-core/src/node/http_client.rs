//! JSON-RPC node client over HTTP.
//!
//! Speaks the bitcoind-style JSON-RPC dialect: `getblockchaininfo` for tip
//! probes, `sendrawtransaction` for submission, `getrawtransaction` and
//! `gettxout` for conflict checks. Transport errors are classified into
//! the [`NodeError`] taxonomy at this boundary so nothing above it has to
//! know about HTTP.

use super::{NodeClient, NodeEndpoint, NodeError};
use crate::types::{BlockHash, ChainTip, ConflictReport, OutPoint, TxId};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, trace};
use url::Url;

/// JSON-RPC error object returned by the node.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// bitcoind error code for "transaction not found".
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

/// `NodeClient` implementation over HTTP JSON-RPC.
///
/// The underlying `reqwest::Client` pools connections and tolerates
/// concurrent use, so one `HttpNodeClient` serves any number of callers.
pub struct HttpNodeClient {
    name: Arc<str>,
    url: String,
    auth: Option<(String, String)>,
    client: Client,
    request_id: AtomicU64,
}

impl HttpNodeClient {
    /// Builds a client for one endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Unreachable`] if the URL is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(endpoint: &NodeEndpoint) -> Result<Self, NodeError> {
        Url::parse(&endpoint.url)
            .map_err(|e| NodeError::Unreachable(format!("invalid endpoint url: {e}")))?;

        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| NodeError::Unreachable(format!("http client build failed: {e}")))?;

        let auth = match (&endpoint.username, &endpoint.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            (Some(user), None) => Some((user.clone(), String::new())),
            _ => None,
        };

        Ok(Self {
            name: Arc::from(endpoint.name.as_str()),
            url: endpoint.url.clone(),
            auth,
            client,
            request_id: AtomicU64::new(1),
        })
    }

    /// Performs one JSON-RPC call with the given deadline.
    ///
    /// The outer `Result` classifies transport failures; the inner one
    /// carries the node's own error object, which each method maps into
    /// the taxonomy according to what the error means for that call.
    async fn call(
        &self,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Result<Value, RpcError>, NodeError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let mut request = self.client.post(&self.url).json(&body).timeout(deadline);
        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }

        trace!(node = %self.name, method, "rpc call");
        let response = request.send().await.map_err(|e| NodeError::from_transport(&e))?;

        // bitcoind answers RPC-level errors with a 500 and a JSON body;
        // parse the body before judging the status code.
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| NodeError::from_transport(&e))?;

        let envelope: RpcEnvelope = serde_json::from_slice(&bytes).map_err(|e| {
            if status.is_success() {
                NodeError::MalformedResponse(format!("invalid json-rpc body: {e}"))
            } else {
                NodeError::Unreachable(format!("http status {status}"))
            }
        })?;

        match (envelope.result, envelope.error) {
            (_, Some(error)) => Ok(Err(error)),
            (Some(result), None) => Ok(Ok(result)),
            (None, None) => {
                Err(NodeError::MalformedResponse("missing both result and error".to_string()))
            }
        }
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    fn name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    async fn probe_tip(&self, deadline: Duration) -> Result<ChainTip, NodeError> {
        // `Rejected` is reserved for submission verdicts; an RPC error on
        // a plain query means the endpoint's answer is unusable.
        let result = self
            .call("getblockchaininfo", json!([]), deadline)
            .await?
            .map_err(|e| {
                NodeError::MalformedResponse(format!("rpc error: {} ({})", e.message, e.code))
            })?;

        let hash_hex = result
            .get("bestblockhash")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::MalformedResponse("missing bestblockhash".to_string()))?;
        let height = result
            .get("blocks")
            .and_then(Value::as_u64)
            .ok_or_else(|| NodeError::MalformedResponse("missing blocks".to_string()))?;
        let hash = BlockHash::from_hex(hash_hex)
            .map_err(|e| NodeError::MalformedResponse(e.to_string()))?;

        let tip = ChainTip::new(hash, height);
        debug!(node = %self.name, height, hash = %hash, "probed tip");
        Ok(tip)
    }

    async fn submit_tx(&self, raw_tx: Bytes, deadline: Duration) -> Result<TxId, NodeError> {
        let result = self
            .call("sendrawtransaction", json!([hex::encode(&raw_tx)]), deadline)
            .await?
            .map_err(|e| NodeError::Rejected(e.message))?;

        let txid_hex = result
            .as_str()
            .ok_or_else(|| NodeError::MalformedResponse("txid is not a string".to_string()))?;
        TxId::from_hex(txid_hex).map_err(|e| NodeError::MalformedResponse(e.to_string()))
    }

    async fn check_conflicts(
        &self,
        tx_id: TxId,
        inputs: &[OutPoint],
        deadline: Duration,
    ) -> Result<Option<ConflictReport>, NodeError> {
        // If the node knows the transaction (mempool or chain), its inputs
        // are spent by *our* tx and there is nothing to corroborate.
        match self.call("getrawtransaction", json!([tx_id.to_string(), false]), deadline).await? {
            Ok(_) => return Ok(None),
            Err(e) if e.code == RPC_INVALID_ADDRESS_OR_KEY => {}
            Err(e) => {
                return Err(NodeError::MalformedResponse(format!(
                    "rpc error: {} ({})",
                    e.message, e.code
                )))
            }
        }

        // The node has not seen our tx. Any input outpoint no longer
        // spendable from its point of view was consumed by a competitor.
        // This dialect cannot name the competing tx, so the report carries
        // no conflicting id; push-style sources that know it inject it via
        // `SafetyMonitor::report_conflict` instead.
        for input in inputs {
            let outcome = self
                .call(
                    "gettxout",
                    json!([input.txid.to_string(), input.vout, true]),
                    deadline,
                )
                .await?
                .map_err(|e| {
                    NodeError::MalformedResponse(format!("rpc error: {} ({})", e.message, e.code))
                })?;

            if outcome.is_null() {
                debug!(node = %self.name, tx = %tx_id, outpoint = %input, "conflicting spend observed");
                return Ok(Some(ConflictReport {
                    conflicting_tx_id: None,
                    reported_by: Arc::clone(&self.name),
                }));
            }
        }

        Ok(None)
    }
}
