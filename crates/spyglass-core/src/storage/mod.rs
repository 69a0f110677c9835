//! Header-storage collaborator seam.
//!
//! Persistence of block headers is outside the core; the tracker only
//! calls `get`/`put` by height through this trait. The scheduler persists
//! each accepted tip, and callers replaying history read it back.

use async_trait::async_trait;
use thiserror::Error;

/// Failure from the storage collaborator. Opaque to the core; logged and
/// never fatal.
#[derive(Debug, Error)]
#[error("header store failure: {0}")]
pub struct StoreError(pub String);

/// Persists and retrieves block headers by height.
#[async_trait]
pub trait HeaderStore: Send + Sync {
    /// Returns the stored header bytes for `height`, if any.
    async fn get(&self, height: u64) -> Result<Option<Vec<u8>>, StoreError>;

    /// Stores header bytes for `height`, replacing any previous value.
    async fn put(&self, height: u64, header: &[u8]) -> Result<(), StoreError>;
}
