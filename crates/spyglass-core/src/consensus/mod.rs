//! Chain-tip consensus across multiple independently-operated nodes.
//!
//! No single node is authoritative. A round fans a probe out to every
//! configured endpoint in parallel, discards failures, and resolves the
//! group's best-known tip with a deterministic rule. The core selection
//! algorithm lives in [`select`]; [`aggregator`] owns the fan-out/fan-in.

pub mod aggregator;
pub mod select;

pub use aggregator::TipAggregator;
pub use select::select_tip;

use crate::{node::NodeError, types::ChainTip};
use std::{sync::Arc, time::Duration};

/// What one endpoint contributed to an aggregation round.
#[derive(Debug)]
pub struct ProbeOutcome {
    /// Endpoint identifier.
    pub endpoint: Arc<str>,
    /// The probed tip, or the classified failure.
    pub result: Result<ChainTip, NodeError>,
}

/// One completed aggregation round: the resolved tip plus the full set of
/// per-node outcomes for diagnostic use.
#[derive(Debug)]
pub struct AggregationRound {
    /// The tip selected by the consensus rule.
    pub selected: ChainTip,
    /// Every endpoint's outcome, successes and failures alike.
    pub responses: Vec<ProbeOutcome>,
    /// Wall time the round took end to end.
    pub duration: Duration,
}

impl AggregationRound {
    /// Number of endpoints that answered successfully.
    #[must_use]
    pub fn responding_count(&self) -> usize {
        self.responses.iter().filter(|r| r.result.is_ok()).count()
    }
}
