//! Integration tests for shotgun broadcast.
//!
//! Mixed-health endpoint sets: partial outages, deterministic rejections,
//! retry budgets, and the shape of the resulting attempt histories.

use crate::mock_infrastructure::{tip, txid, MockNodeClient, SubmitBehavior};
use bytes::Bytes;
use spyglass_core::{
    broadcast::BroadcastMultiplexer,
    node::NodeClient,
    retry::RetryPolicy,
    types::AttemptOutcome,
};
use std::{sync::Arc, time::Duration};

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);

fn multiplexer(
    clients: Vec<Arc<MockNodeClient>>,
    shotgun_count: usize,
    max_retries: u32,
) -> BroadcastMultiplexer {
    let clients = clients.into_iter().map(|c| c as Arc<dyn NodeClient>).collect();
    BroadcastMultiplexer::new(
        clients,
        shotgun_count,
        RetryPolicy { max_retries, retry_delay: Duration::from_millis(500) },
        SUBMIT_TIMEOUT,
    )
    .expect("valid multiplexer parameters")
}

fn node(name: &str, submit: SubmitBehavior) -> Arc<MockNodeClient> {
    MockNodeClient::submitting(name, tip(1, 0x01), submit)
}

#[tokio::test(start_paused = true)]
async fn test_partial_outage_still_succeeds() {
    let down_a = node("down-a", SubmitBehavior::Unreachable);
    let down_b = node("down-b", SubmitBehavior::Unreachable);
    let up = node("up", SubmitBehavior::Accept);

    let mux = multiplexer(vec![Arc::clone(&down_a), Arc::clone(&down_b), Arc::clone(&up)], 3, 2);
    let result = mux.broadcast(txid(0x30), Bytes::from_static(b"\x01\x02")).await;

    assert!(result.accepted);
    assert_eq!(result.accepting_endpoints(), vec![Arc::from("up")]);

    // Each dead endpoint burned its full retry budget; the live one
    // needed a single attempt.
    assert_eq!(down_a.submit_calls(), 3);
    assert_eq!(down_b.submit_calls(), 3);
    assert_eq!(up.submit_calls(), 1);

    // History holds every attempt from every endpoint.
    assert_eq!(result.attempts.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_unanimous_rejection_fails_without_retry() {
    let a = node("a", SubmitBehavior::Reject("txn-mempool-conflict".to_string()));
    let b = node("b", SubmitBehavior::Reject("txn-mempool-conflict".to_string()));

    let mux = multiplexer(vec![Arc::clone(&a), Arc::clone(&b)], 2, 25);
    let result = mux.broadcast(txid(0x31), Bytes::from_static(b"\x01")).await;

    assert!(!result.accepted);
    assert_eq!(a.submit_calls(), 1);
    assert_eq!(b.submit_calls(), 1);
    for attempt in &result.attempts {
        assert!(matches!(attempt.outcome, AttemptOutcome::Rejected(_)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_flaky_endpoint_recovers_within_budget() {
    let flaky = node("flaky", SubmitBehavior::FlakyThenAccept(3));

    let mux = multiplexer(vec![Arc::clone(&flaky)], 1, 5);
    let result = mux.broadcast(txid(0x32), Bytes::from_static(b"\x01")).await;

    assert!(result.accepted);
    assert_eq!(flaky.submit_calls(), 4);
    let last = result.attempts.last().unwrap();
    assert_eq!(last.outcome, AttemptOutcome::Accepted);
    assert_eq!(last.attempt_number, 4);
}

#[tokio::test(start_paused = true)]
async fn test_flaky_endpoint_exhausts_budget() {
    let flaky = node("flaky", SubmitBehavior::FlakyThenAccept(10));

    let mux = multiplexer(vec![Arc::clone(&flaky)], 1, 2);
    let result = mux.broadcast(txid(0x33), Bytes::from_static(b"\x01")).await;

    assert!(!result.accepted);
    assert_eq!(flaky.submit_calls(), 3);
    assert!(result.attempts.iter().all(|a| a.outcome == AttemptOutcome::TimedOut));
}

#[tokio::test(start_paused = true)]
async fn test_shotgun_takes_endpoints_in_configured_order() {
    let first = node("first", SubmitBehavior::Accept);
    let second = node("second", SubmitBehavior::Accept);
    let third = node("third", SubmitBehavior::Accept);

    let mux =
        multiplexer(vec![Arc::clone(&first), Arc::clone(&second), Arc::clone(&third)], 2, 0);
    let result = mux.broadcast(txid(0x34), Bytes::from_static(b"\x01")).await;

    assert!(result.accepted);
    assert_eq!(first.submit_calls(), 1);
    assert_eq!(second.submit_calls(), 1);
    assert_eq!(third.submit_calls(), 0);
}
