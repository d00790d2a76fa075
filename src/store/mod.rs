//! Counting store backends.
//!
//! The limiter holds no state of its own; all window contents live in a
//! counting store shared by every serving process. Correctness under
//! concurrency is delegated entirely to the store: the whole
//! prune-count-add sequence must execute as one indivisible operation on
//! the store side, never as separate read and write calls from the client.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::limiter::Decision;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// External collaborator holding per-key request timestamps.
///
/// Implementations must make [`prune_count_add`](CountingStore::prune_count_add)
/// linearizable with respect to concurrent calls for the same key: two
/// callers racing at the quota boundary must never both be admitted.
#[async_trait]
pub trait CountingStore: Send + Sync {
    /// Atomically: drop timestamps older than `cutoff`, count survivors,
    /// and if the count is below `limit` record `now` and refresh the key's
    /// expiry to `ttl`. Returns the admission decision. On denial the store
    /// is not mutated.
    async fn prune_count_add(
        &self,
        key: &str,
        cutoff: f64,
        limit: u32,
        now: f64,
        ttl: Duration,
    ) -> Result<Decision>;

    /// Number of timestamps at or after `cutoff` currently recorded for
    /// `key`. Prunes expired entries as a side effect.
    async fn count_in_window(&self, key: &str, cutoff: f64) -> Result<u64>;

    /// Drop all recorded timestamps for `key`.
    async fn reset(&self, key: &str) -> Result<()>;
}
