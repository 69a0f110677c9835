//! Integration tests for tracker runtime wiring.
//!
//! These build full trackers through the public builder against loopback
//! endpoint configs. No node is listening; everything here exercises
//! initialization, the facade, and shutdown rather than network behavior.

use bytes::Bytes;
use spyglass_core::{
    config::AppConfig,
    node::{NodeEndpoint, TrackerError},
    runtime::{RuntimeError, Tracker},
    types::{SafetyState, TxId},
};
use std::time::Duration;
use tokio::time::sleep;

fn endpoint(name: &str, port: u16, untrusted: bool) -> NodeEndpoint {
    NodeEndpoint {
        name: name.to_string(),
        url: format!("http://127.0.0.1:{port}"),
        username: None,
        password: None,
        untrusted,
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.nodes.endpoints = vec![
        endpoint("primary", 18332, false),
        endpoint("secondary", 18333, false),
        endpoint("watcher", 18334, true),
    ];
    // Short windows so facade tests finish quickly.
    config.safety.safe_tx_delay_ms = 200;
    config.safety.poll_interval_ms = 50;
    config.broadcast.max_retries = 0;
    config
}

#[tokio::test]
async fn test_tracker_builds_and_shuts_down() {
    let tracker = Tracker::builder().with_config(test_config()).build().unwrap();
    assert!(matches!(tracker.current_tip(), Err(TrackerError::TipUnavailable)));
    tracker.shutdown().await;
}

#[tokio::test]
async fn test_tracker_rejects_invalid_config() {
    let mut config = test_config();
    config.refresh.interval_seconds = 0;

    let result = Tracker::builder().with_config(config).build();
    assert!(matches!(result, Err(RuntimeError::ConfigValidation(_))));
}

#[tokio::test]
async fn test_facade_tracks_transactions() {
    let tracker = Tracker::builder().with_config(test_config()).build().unwrap();

    let handle = tracker.track_transaction(TxId::new([0x42; 32]), vec![]);
    assert_eq!(tracker.safety_state(handle), Some(SafetyState::Pending));

    // The watcher endpoint refuses connections; its polls fail open and
    // the quiet window still promotes the transaction.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(tracker.safety_state(handle), Some(SafetyState::Safe));

    let record = tracker.take_if_final(handle).unwrap();
    assert_eq!(record.state, SafetyState::Safe);
    assert!(tracker.safety_state(handle).is_none());

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_broadcast_against_dead_endpoints_reports_failure() {
    let tracker = Tracker::builder().with_config(test_config()).build().unwrap();

    let result = tracker.broadcast(TxId::new([0x43; 32]), Bytes::from_static(b"\x01\x02")).await;

    assert!(!result.accepted);
    // One terminal attempt per trusted endpoint, no retries configured.
    assert_eq!(result.attempts.len(), 2);

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_notifier_survives_across_clones() {
    let tracker = Tracker::builder()
        .with_config(test_config())
        .enable_push_notifications()
        .build()
        .unwrap();

    let notifier = tracker.notifier();
    let cloned = notifier.clone();
    notifier.notify_new_block();
    cloned.notify_new_block();

    tracker.shutdown().await;

    // Notifying after shutdown is a no-op, not a panic.
    cloned.notify_new_block();
}
