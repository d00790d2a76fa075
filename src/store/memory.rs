//! In-process counting store.
//!
//! Suitable for tests and single-process deployments. The window map lives
//! behind one mutex, so prune-count-add is atomic with respect to every
//! other call in this process. State is not shared across processes; use
//! [`RedisStore`](super::RedisStore) when multiple instances must enforce
//! one quota.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::CountingStore;
use crate::error::{RateLimitError, Result};
use crate::limiter::Decision;

/// Recorded requests for one key, still within the trailing window as of
/// the last access.
#[derive(Debug)]
struct WindowEntry {
    /// Accepted-request timestamps in seconds, ascending.
    timestamps: Vec<f64>,
    /// Instant after which the whole entry is considered expired, mirroring
    /// the TTL a remote store would apply.
    expires_at: f64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: Mutex<HashMap<String, WindowEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked. Expired entries linger until the
    /// next access touches them.
    pub fn key_count(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, WindowEntry>>> {
        self.windows
            .lock()
            .map_err(|_| RateLimitError::StoreUnavailable("window map lock poisoned".to_string()))
    }
}

#[async_trait]
impl CountingStore for MemoryStore {
    async fn prune_count_add(
        &self,
        key: &str,
        cutoff: f64,
        limit: u32,
        now: f64,
        ttl: Duration,
    ) -> Result<Decision> {
        let mut windows = self.lock()?;

        // Lazy TTL: a key untouched past its expiry starts fresh.
        if windows.get(key).is_some_and(|e| e.expires_at <= now) {
            windows.remove(key);
        }

        let entry = windows.entry(key.to_string()).or_insert_with(|| WindowEntry {
            timestamps: Vec::new(),
            expires_at: now + ttl.as_secs_f64(),
        });

        entry.timestamps.retain(|&ts| ts >= cutoff);

        if (entry.timestamps.len() as u64) < u64::from(limit) {
            entry.timestamps.push(now);
            entry.timestamps.sort_by(|a, b| a.total_cmp(b));
            entry.expires_at = now + ttl.as_secs_f64();
            Ok(Decision::Allowed)
        } else {
            Ok(Decision::Denied)
        }
    }

    async fn count_in_window(&self, key: &str, cutoff: f64) -> Result<u64> {
        let mut windows = self.lock()?;
        match windows.get_mut(key) {
            Some(entry) => {
                entry.timestamps.retain(|&ts| ts >= cutoff);
                Ok(entry.timestamps.len() as u64)
            }
            None => Ok(0),
        }
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
