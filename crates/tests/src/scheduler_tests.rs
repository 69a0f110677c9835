//! Integration tests for the refresh scheduler.
//!
//! Paused-time tests driving the full scheduler loop against mock nodes:
//! timer cadence, notification bursts collapsing into single rounds, and
//! failed rounds leaving the cached tip in place.

use crate::mock_infrastructure::{tip, MockNodeClient};
use spyglass_core::{consensus::TipAggregator, node::NodeClient, scheduler::RefreshScheduler, tip::TipCache};
use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast, time::sleep};

const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

fn components(
    node: &Arc<MockNodeClient>,
) -> (Arc<TipAggregator>, Arc<TipCache>) {
    let aggregator = Arc::new(
        TipAggregator::new(vec![Arc::clone(node) as Arc<dyn NodeClient>], Duration::from_secs(5))
            .unwrap(),
    );
    (aggregator, Arc::new(TipCache::new()))
}

#[tokio::test(start_paused = true)]
async fn test_timer_refreshes_on_interval() {
    let node = MockNodeClient::healthy("a", tip(100, 0x01));
    let (aggregator, cache) = components(&node);
    let (shutdown_tx, _) = broadcast::channel(4);

    let (scheduler, _notifier) =
        RefreshScheduler::new(aggregator, Arc::clone(&cache), REFRESH_INTERVAL, true);
    let task = scheduler.start_with_shutdown(shutdown_tx.subscribe());

    // The first tick fires immediately.
    sleep(Duration::from_millis(10)).await;
    assert_eq!(node.probe_calls(), 1);
    assert_eq!(cache.current().unwrap().height, 100);

    node.set_tip(tip(101, 0x02));
    sleep(REFRESH_INTERVAL).await;
    assert_eq!(node.probe_calls(), 2);
    assert_eq!(cache.current().unwrap().height, 101);

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_notification_burst_coalesces_into_one_round() {
    let node = MockNodeClient::healthy("a", tip(100, 0x01));
    let (aggregator, cache) = components(&node);
    let (shutdown_tx, _) = broadcast::channel(4);

    let (scheduler, notifier) =
        RefreshScheduler::new(aggregator, Arc::clone(&cache), REFRESH_INTERVAL, true);
    let task = scheduler.start_with_shutdown(shutdown_tx.subscribe());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(node.probe_calls(), 1);

    // Five announcements land before the loop wakes; one round results.
    node.set_tip(tip(101, 0x02));
    for _ in 0..5 {
        notifier.notify_new_block();
    }
    sleep(Duration::from_millis(10)).await;
    assert_eq!(node.probe_calls(), 2);
    assert_eq!(cache.current().unwrap().height, 101);

    // The timer still fires on schedule afterwards.
    sleep(REFRESH_INTERVAL).await;
    assert_eq!(node.probe_calls(), 3);

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_rounds_leave_cached_tip_standing() {
    let node = MockNodeClient::healthy("a", tip(100, 0x01));
    let (aggregator, cache) = components(&node);
    let (shutdown_tx, _) = broadcast::channel(4);

    let (scheduler, _notifier) =
        RefreshScheduler::new(aggregator, Arc::clone(&cache), REFRESH_INTERVAL, true);
    let task = scheduler.start_with_shutdown(shutdown_tx.subscribe());

    sleep(Duration::from_millis(10)).await;
    assert_eq!(cache.current().unwrap().height, 100);

    // Every subsequent round fails; the cache keeps serving height 100.
    node.set_unreachable();
    sleep(REFRESH_INTERVAL * 3).await;
    assert!(node.probe_calls() >= 3);
    assert_eq!(cache.current().unwrap().height, 100);

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timer_only_mode_still_refreshes() {
    let node = MockNodeClient::healthy("a", tip(100, 0x01));
    let (aggregator, cache) = components(&node);
    let (shutdown_tx, _) = broadcast::channel(4);

    // push_available = false: degraded mode, notifier intentionally unused.
    let (scheduler, _notifier) =
        RefreshScheduler::new(aggregator, Arc::clone(&cache), REFRESH_INTERVAL, false);
    let task = scheduler.start_with_shutdown(shutdown_tx.subscribe());

    sleep(Duration::from_millis(10)).await;
    node.set_tip(tip(150, 0x05));
    sleep(REFRESH_INTERVAL).await;
    assert_eq!(cache.current().unwrap().height, 150);

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_stops_on_shutdown_signal() {
    let node = MockNodeClient::healthy("a", tip(100, 0x01));
    let (aggregator, cache) = components(&node);
    let (shutdown_tx, _) = broadcast::channel(4);

    let (scheduler, _notifier) =
        RefreshScheduler::new(aggregator, cache, REFRESH_INTERVAL, true);
    let task = scheduler.start_with_shutdown(shutdown_tx.subscribe());

    sleep(Duration::from_millis(10)).await;
    shutdown_tx.send(()).unwrap();
    task.await.unwrap();

    // No further refreshes after the task exits.
    let calls = node.probe_calls();
    sleep(REFRESH_INTERVAL * 2).await;
    assert_eq!(node.probe_calls(), calls);
}
