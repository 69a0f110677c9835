//! Cached consensus chain tip.
//!
//! `TipCache` is the only state mutated by multiple concurrent producers:
//! overlapping aggregation rounds can race (a slow round finishing after a
//! faster later one), so writes are serialized and guarded for height
//! monotonicity. Reads are lock-free and never wait longer than a write's
//! store.

use crate::types::ChainTip;
use arc_swap::ArcSwap;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::RwLock;
use tracing::{debug, trace};

fn current_unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Holds the last resolved consensus tip plus its capture timestamp.
///
/// # Thread safety
///
/// Reads load an `ArcSwap` and never block. Writes take an async lock so
/// the compare-and-store critical section is exclusive, which is what the
/// monotonicity guard needs to be race-free.
pub struct TipCache {
    tip: ArcSwap<Option<ChainTip>>,
    write_lock: RwLock<()>,
    /// Unix timestamp (seconds) of the last accepted write.
    last_written: AtomicU64,
}

impl TipCache {
    /// Creates an empty cache. `current()` returns `None` until the first
    /// aggregation round lands.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tip: ArcSwap::from_pointee(None),
            write_lock: RwLock::new(()),
            last_written: AtomicU64::new(current_unix_timestamp()),
        }
    }

    /// Returns the cached tip, if any round has ever succeeded.
    ///
    /// Never performs network I/O and never blocks on a writer beyond the
    /// atomic store itself.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<ChainTip> {
        **self.tip.load()
    }

    /// Replaces the cached tip if the monotonicity guard allows it.
    ///
    /// A write is accepted when the new height is strictly greater, or
    /// equal with a different hash (same-height replacement). A lower
    /// height — a stale write from a slow round that finished after a
    /// faster later one — is rejected, as is an identical tip.
    ///
    /// Returns `true` if the value was stored.
    pub async fn write(&self, tip: ChainTip) -> bool {
        let _guard = self.write_lock.write().await;

        if let Some(current) = **self.tip.load() {
            if tip.height < current.height {
                debug!(
                    cached_height = current.height,
                    offered_height = tip.height,
                    "rejecting stale tip write"
                );
                return false;
            }
            if tip.height == current.height && tip.hash == current.hash {
                trace!(height = tip.height, "tip unchanged");
                return false;
            }
        }

        self.tip.store(Arc::new(Some(tip)));
        self.last_written.store(current_unix_timestamp(), Ordering::Release);
        trace!(height = tip.height, hash = %tip.hash, "tip cache updated");
        true
    }

    /// Seconds since the last accepted write. Grows without bound while
    /// rounds keep failing, which is how callers detect staleness and
    /// force a refresh.
    #[inline]
    #[must_use]
    pub fn age_seconds(&self) -> u64 {
        current_unix_timestamp().saturating_sub(self.last_written.load(Ordering::Acquire))
    }

    /// [`Self::age_seconds`] as a `Duration`.
    #[inline]
    #[must_use]
    pub fn age(&self) -> Duration {
        Duration::from_secs(self.age_seconds())
    }
}

impl Default for TipCache {
    fn default() -> Self {
        Self::new()
    }
}
