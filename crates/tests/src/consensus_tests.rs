//! Integration tests for tip aggregation.
//!
//! These tests verify that aggregation rounds behave correctly against
//! actual mock nodes:
//! - The highest reported height wins, with hash plurality on ties
//! - Failing and slow nodes are excluded without sinking the round
//! - A round with zero responses reports no quorum
//! - The aggregator-to-cache pipeline never lets the height regress

use crate::mock_infrastructure::{tip, MockNodeClient};
use spyglass_core::{
    consensus::TipAggregator,
    node::{NodeClient, TrackerError},
    tip::TipCache,
};
use std::{sync::Arc, time::Duration};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn aggregator(clients: Vec<Arc<MockNodeClient>>) -> TipAggregator {
    let clients = clients.into_iter().map(|c| c as Arc<dyn NodeClient>).collect();
    TipAggregator::new(clients, PROBE_TIMEOUT).expect("non-empty client set")
}

#[tokio::test]
async fn test_highest_height_wins_across_nodes() {
    let nodes = vec![
        MockNodeClient::healthy("a", tip(100, 0x01)),
        MockNodeClient::healthy("b", tip(102, 0x02)),
        MockNodeClient::healthy("c", tip(101, 0x03)),
    ];

    let round = aggregator(nodes).aggregate().await.unwrap();
    assert_eq!(round.selected.height, 102);
    assert_eq!(round.selected.hash, tip(102, 0x02).hash);
    assert_eq!(round.responding_count(), 3);
}

#[tokio::test]
async fn test_hash_plurality_breaks_height_ties() {
    // Two nodes agree on one hash at the top height, one dissents.
    let nodes = vec![
        MockNodeClient::healthy("a", tip(200, 0x0A)),
        MockNodeClient::healthy("b", tip(200, 0x0B)),
        MockNodeClient::healthy("c", tip(200, 0x0A)),
    ];

    let round = aggregator(nodes).aggregate().await.unwrap();
    assert_eq!(round.selected.hash, tip(200, 0x0A).hash);
}

#[tokio::test]
async fn test_failing_nodes_do_not_sink_the_round() {
    let nodes = vec![
        MockNodeClient::unreachable("down-1"),
        MockNodeClient::healthy("up", tip(150, 0x05)),
        MockNodeClient::unreachable("down-2"),
    ];

    let round = aggregator(nodes).aggregate().await.unwrap();
    assert_eq!(round.selected.height, 150);
    assert_eq!(round.responding_count(), 1);
}

#[tokio::test]
async fn test_all_nodes_failing_is_no_quorum() {
    let nodes =
        vec![MockNodeClient::unreachable("down-1"), MockNodeClient::unreachable("down-2")];

    let result = aggregator(nodes).aggregate().await;
    assert!(matches!(result, Err(TrackerError::NoQuorum { attempted: 2 })));
}

#[tokio::test(start_paused = true)]
async fn test_slow_node_is_timed_out_not_awaited() {
    let slow = MockNodeClient::slow("slow", Duration::from_secs(30), tip(999, 0x09));
    let nodes = vec![Arc::clone(&slow), MockNodeClient::healthy("fast", tip(100, 0x01))];

    let round = aggregator(nodes).aggregate().await.unwrap();
    // The slow node's higher tip never arrived inside the deadline.
    assert_eq!(round.selected.height, 100);
    assert_eq!(round.responding_count(), 1);
    assert!(round.duration <= Duration::from_secs(6));
}

#[tokio::test]
async fn test_pipeline_height_never_regresses() {
    let node = MockNodeClient::healthy("a", tip(100, 0x01));
    let agg = aggregator(vec![Arc::clone(&node)]);
    let cache = TipCache::new();

    let round = agg.aggregate().await.unwrap();
    assert!(cache.write(round.selected).await);
    assert_eq!(cache.current().unwrap().height, 100);

    // The node advances, then claims a lower height (restarted from a
    // stale snapshot). The cache must keep the high-water mark.
    node.set_tip(tip(105, 0x02));
    let round = agg.aggregate().await.unwrap();
    assert!(cache.write(round.selected).await);

    node.set_tip(tip(90, 0x03));
    let round = agg.aggregate().await.unwrap();
    assert!(!cache.write(round.selected).await);
    assert_eq!(cache.current().unwrap().height, 105);
}

#[tokio::test]
async fn test_repeated_rounds_are_deterministic() {
    let nodes = vec![
        MockNodeClient::healthy("a", tip(300, 0x0C)),
        MockNodeClient::healthy("b", tip(300, 0x0B)),
    ];
    let agg = aggregator(nodes);

    // A 1-1 hash split resolves by smallest hash, every time.
    let first = agg.aggregate().await.unwrap().selected;
    for _ in 0..5 {
        let again = agg.aggregate().await.unwrap().selected;
        assert_eq!(again.hash, first.hash);
    }
    assert_eq!(first.hash, tip(300, 0x0B).hash);
}
