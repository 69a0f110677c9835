//! # Spyglass Core
//!
//! Core library for Spyglass, a multi-node chain tracker for applications
//! that need trustworthy chain state without running their own full node.
//!
//! This crate provides the foundational components for:
//!
//! - **[`consensus`]**: Parallel tip probing across trusted endpoints with
//!   deterministic selection (height first, hash plurality on ties).
//!
//! - **[`tip`]**: Lock-free cached consensus tip with a height
//!   monotonicity guard against stale concurrent writes.
//!
//! - **[`scheduler`]**: Refresh loop combining a periodic timer with
//!   coalesced new-block push notifications.
//!
//! - **[`safety`]**: Transaction safety monitoring — each tracked
//!   transaction resolves to `Safe` after a conflict-free window or
//!   `Conflicted` on the first corroborated double-spend report from an
//!   untrusted node.
//!
//! - **[`broadcast`]**: Redundant "shotgun" submission of raw
//!   transactions to several endpoints with bounded per-endpoint retry.
//!
//! - **[`node`]**: The JSON-RPC client seam, with typed error
//!   classification separating transient faults from deterministic
//!   rejections.
//!
//! - **[`storage`]**: Pluggable header persistence by height.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Tracker                            │
//! │  ┌────────────────┐  ┌───────────────┐  ┌────────────────┐   │
//! │  │RefreshScheduler│  │ SafetyMonitor │  │ BroadcastMux   │   │
//! │  └───────┬────────┘  └───────┬───────┘  └───────┬────────┘   │
//! │          │                   │                  │            │
//! │  ┌───────▼────────┐  ┌───────▼───────┐  ┌───────▼────────┐   │
//! │  │ TipAggregator  │  │ untrusted set │  │  trusted set   │   │
//! │  │   TipCache     │  │ (NodeClient)  │  │  (NodeClient)  │   │
//! │  └────────────────┘  └───────────────┘  └────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trust model
//!
//! Trusted endpoints are authoritative for consensus state and receive
//! broadcasts. Untrusted endpoints are corroborating witnesses only: a
//! single conflict report from any one of them is enough to flag a
//! tracked transaction, but none of them can advance the cached tip.

pub mod broadcast;
pub mod config;
pub mod consensus;
pub mod node;
pub mod retry;
pub mod runtime;
pub mod safety;
pub mod scheduler;
pub mod storage;
pub mod tip;
pub mod types;

pub use config::AppConfig;
pub use node::{NodeClient, NodeEndpoint, NodeError, TrackerError};
pub use runtime::{Tracker, TrackerBuilder};
pub use types::{
    BlockHash, BroadcastResult, ChainTip, ConflictReport, OutPoint, SafetyState, TxId,
};
