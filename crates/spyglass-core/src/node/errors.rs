use thiserror::Error;

/// Errors from a single node RPC call.
///
/// The taxonomy drives retry policy everywhere in the crate:
/// - `Unreachable` and `Timeout` are transient and worth retrying
/// - `MalformedResponse` discards that node's data for the round, no retry
/// - `Rejected` reflects a deterministic node-side policy decision, never
///   retried
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NodeError {
    /// Dial or transport failure before a response arrived.
    #[error("node unreachable: {0}")]
    Unreachable(String),

    /// Deadline expired before the node answered.
    #[error("request timeout")]
    Timeout,

    /// The node answered, but the payload violated the expected protocol.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The node refused the request (e.g. transaction policy rejection).
    #[error("rejected by node: {0}")]
    Rejected(String),
}

impl NodeError {
    /// Returns `true` if a retry against the same endpoint can help.
    ///
    /// Only network-level failures qualify. A rejection is a policy
    /// decision the node will repeat, and a malformed response means the
    /// endpoint's data for this round is untrustworthy either way.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout)
    }

    /// Returns `true` if this error indicates an endpoint problem rather
    /// than a caller problem. Used for diagnostics when summarizing a
    /// round's failures.
    #[must_use]
    pub fn is_endpoint_fault(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout | Self::MalformedResponse(_))
    }

    /// Static label for log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::Timeout => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Classifies a transport error from the HTTP client.
    ///
    /// Timeouts keep their own variant so the retry classifier and the
    /// aggregation deadline accounting can tell them apart from dial
    /// failures. Everything else at the transport level is `Unreachable`
    /// with a sanitized description.
    #[must_use]
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        let detail = if error.is_connect() {
            "connection refused or unreachable"
        } else if error.is_request() {
            "request failed"
        } else if error.is_body() || error.is_decode() {
            return Self::MalformedResponse("response body error".to_string());
        } else {
            "network error"
        };
        Self::Unreachable(detail.to_string())
    }
}

/// Round-level errors surfaced to callers of the tracker.
///
/// Node-level errors are recovered locally (aggregation continues with the
/// remaining nodes); these are the failures that cannot be hidden.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TrackerError {
    /// Every probe in an aggregation round failed. The cache keeps serving
    /// its last-known tip with a growing age.
    #[error("no quorum: all {attempted} probes failed")]
    NoQuorum {
        /// Number of endpoints probed in the failed round.
        attempted: usize,
    },

    /// No node endpoints are configured at all.
    #[error("no node endpoints configured")]
    NoEndpoints,

    /// The tip cache has never been populated.
    #[error("chain tip not yet known")]
    TipUnavailable,

    /// Configuration was rejected at load or build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
