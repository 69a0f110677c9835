//! Deterministic tip selection.
//!
//! Given the successful responses of one aggregation round, the rule is:
//!
//! 1. Greatest height wins.
//! 2. On a height tie, the hash reported by the most responding nodes
//!    wins (plurality).
//! 3. On a plurality tie, the lexicographically smallest hash wins — an
//!    arbitrary but reproducible rule, since no single node is
//!    authoritative.
//!
//! All functions here are stateless and synchronous, in the same spirit
//! as keeping the consensus algorithm separate from the engine that
//! gathers responses.

use crate::types::{BlockHash, ChainTip};
use std::{collections::HashMap, sync::Arc};

/// Selects the consensus tip from a round's successful responses.
///
/// Returns `None` only for an empty input; the caller surfaces that as a
/// no-quorum failure. The selection is deterministic: the same multiset
/// of responses always yields the same `(height, hash)`.
#[must_use]
pub fn select_tip(responses: &[(Arc<str>, ChainTip)]) -> Option<ChainTip> {
    let max_height = responses.iter().map(|(_, tip)| tip.height).max()?;

    let at_max: Vec<&ChainTip> =
        responses.iter().filter(|(_, tip)| tip.height == max_height).map(|(_, tip)| tip).collect();

    let mut votes: HashMap<BlockHash, usize> = HashMap::with_capacity(at_max.len());
    for tip in &at_max {
        *votes.entry(tip.hash).or_insert(0) += 1;
    }

    // Highest vote count first; equal counts resolved by smallest hash.
    let winning_hash = votes
        .into_iter()
        .min_by(|(hash_a, count_a), (hash_b, count_b)| {
            count_b.cmp(count_a).then(hash_a.cmp(hash_b))
        })
        .map(|(hash, _)| hash)?;

    at_max.iter().find(|tip| tip.hash == winning_hash).map(|tip| **tip)
}
