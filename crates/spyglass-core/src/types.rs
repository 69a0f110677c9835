//! Shared data types for tip tracking, safety monitoring, and broadcast.
//!
//! Everything here is a plain value type. `ChainTip` values are produced
//! fresh on every successful probe and never mutated in place; the cache
//! replaces whole values instead.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;

/// Error returned when parsing a 32-byte digest from hex.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestParseError {
    /// Input was not valid hexadecimal.
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    /// Input decoded to a length other than 32 bytes.
    #[error("digest must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

macro_rules! digest_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Wraps raw digest bytes.
            #[must_use]
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Returns the raw digest bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Parses a digest from a 64-character hex string.
            ///
            /// # Errors
            ///
            /// Returns [`DigestParseError`] if the input is not valid hex or
            /// does not decode to exactly 32 bytes.
            pub fn from_hex(s: &str) -> Result<Self, DigestParseError> {
                let raw = hex::decode(s)
                    .map_err(|e| DigestParseError::InvalidHex(e.to_string()))?;
                let bytes: [u8; 32] =
                    raw.try_into().map_err(|v: Vec<u8>| DigestParseError::InvalidLength(v.len()))?;
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = DigestParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(de::Error::custom)
            }
        }
    };
}

digest_newtype! {
    /// 32-byte block hash. Ordering is lexicographic over the raw bytes,
    /// which is what the deterministic consensus tie-break relies on.
    BlockHash
}

digest_newtype! {
    /// 32-byte transaction id.
    TxId
}

/// A transaction input reference: which output of which transaction is
/// being spent. Two transactions spending the same outpoint conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A node's best-known chain tip at the moment it was probed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    /// Hash of the best block.
    pub hash: BlockHash,
    /// Height of the best block.
    pub height: u64,
    /// Wall-clock time this snapshot was captured.
    pub observed_at: DateTime<Utc>,
}

impl ChainTip {
    /// Creates a tip snapshot captured now.
    #[must_use]
    pub fn new(hash: BlockHash, height: u64) -> Self {
        Self { hash, height, observed_at: Utc::now() }
    }
}

/// Safety classification of a tracked transaction.
///
/// Transitions are monotone in severity: `Pending -> Safe` or
/// `Pending -> Conflicted`. Both `Safe` and `Conflicted` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyState {
    /// Conflict-observation window still open.
    Pending,
    /// Window elapsed with no conflict reported.
    Safe,
    /// An untrusted node reported a conflicting spend. Terminal.
    Conflicted,
}

impl SafetyState {
    /// Returns `true` once the state can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Safe | Self::Conflicted)
    }
}

/// A conflicting-spend observation from an untrusted node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictReport {
    /// The competing transaction id, when the reporting node can name it.
    pub conflicting_tx_id: Option<TxId>,
    /// Name of the node that made the observation.
    pub reported_by: Arc<str>,
}

/// Outcome of one submission attempt against one endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Node accepted the transaction into its mempool.
    Accepted,
    /// Node refused the transaction. Deterministic, never retried.
    Rejected(String),
    /// Dial or transport failure. Retryable.
    Unreachable(String),
    /// Deadline expired before the node answered. Retryable.
    TimedOut,
}

impl AttemptOutcome {
    /// Returns `true` for outcomes worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::TimedOut)
    }
}

/// One submission attempt in a broadcast round. Ephemeral; aggregated into
/// a [`BroadcastResult`] and never persisted.
#[derive(Clone, Debug)]
pub struct BroadcastAttempt {
    /// Endpoint the attempt was sent to.
    pub endpoint: Arc<str>,
    /// Id of the transaction being broadcast.
    pub tx_id: TxId,
    /// What happened.
    pub outcome: AttemptOutcome,
    /// 1-based attempt number for this endpoint.
    pub attempt_number: u32,
}

/// Aggregate result of a shotgun broadcast.
#[derive(Clone, Debug)]
pub struct BroadcastResult {
    /// `true` if at least one endpoint accepted the transaction.
    pub accepted: bool,
    /// Full per-endpoint attempt history, in completion order per endpoint.
    pub attempts: Vec<BroadcastAttempt>,
}

impl BroadcastResult {
    /// Names of the endpoints that accepted the transaction.
    #[must_use]
    pub fn accepting_endpoints(&self) -> Vec<Arc<str>> {
        self.attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Accepted)
            .map(|a| Arc::clone(&a.endpoint))
            .collect()
    }
}
