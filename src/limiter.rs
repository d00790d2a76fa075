use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{RateLimitError, Result};
use crate::key::RateLimitKey;
use crate::store::CountingStore;

/// Outcome of a rate limit evaluation.
///
/// A tagged result rather than a bare bool so the contract stays explicit
/// at call sites and across serialization boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The request fits within the quota and has been recorded.
    Allowed,
    /// The quota is exhausted for the current window. Nothing was recorded.
    Denied,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// How to treat a request when the counting store cannot answer.
///
/// This is safety-relevant and deliberately not defaulted: the limiter
/// itself always surfaces `StoreUnavailable`, and only
/// [`RateLimiter::check_with_policy`] applies one of these, so the choice
/// is visible at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailPolicy {
    /// Admit requests while the store is unreachable.
    Open,
    /// Reject requests while the store is unreachable.
    Closed,
}

impl FromStr for FailPolicy {
    type Err = RateLimitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "fail_open" => Ok(FailPolicy::Open),
            "closed" | "fail_closed" => Ok(FailPolicy::Closed),
            other => Err(RateLimitError::InvalidArgument(format!(
                "unknown fail policy '{other}', expected 'open' or 'closed'"
            ))),
        }
    }
}

/// Sliding-window rate limiter over a shared counting store.
///
/// The limiter is stateless: every evaluation is one atomic round-trip to
/// the injected [`CountingStore`], so any number of processes pointing at
/// the same store enforce one global quota. Safe to clone and call
/// concurrently.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CountingStore>,
    store_timeout: Duration,
}

impl RateLimiter {
    /// Create a limiter over `store` with the default 1s store timeout.
    pub fn new(store: Arc<dyn CountingStore>) -> Self {
        Self::with_timeout(store, Duration::from_secs(1))
    }

    /// Create a limiter with an explicit per-call store timeout. A call
    /// that exceeds it fails with `StoreUnavailable`, never an implicit
    /// decision.
    pub fn with_timeout(store: Arc<dyn CountingStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Decide admit/deny for one request at time `now` (seconds).
    ///
    /// Atomically prunes timestamps older than `now - window_seconds` for
    /// `key`, counts the survivors, and if fewer than `limit` remain
    /// records `now` and refreshes the key's expiry. `now` is
    /// caller-supplied so evaluations are testable and so a fleet of
    /// processes can share one clock source.
    pub async fn check_and_record(
        &self,
        key: &RateLimitKey,
        limit: u32,
        window_seconds: f64,
        now: f64,
    ) -> Result<Decision> {
        validate_args(key, limit, window_seconds)?;

        let cutoff = now - window_seconds;
        let ttl = Duration::try_from_secs_f64(window_seconds).map_err(|_| {
            RateLimitError::InvalidArgument(format!(
                "window_seconds {window_seconds} does not fit in a duration"
            ))
        })?;
        let storage_key = key.storage_key();

        trace!(key = %key, limit, window_seconds, "evaluating rate limit");

        let decision = tokio::time::timeout(
            self.store_timeout,
            self.store
                .prune_count_add(&storage_key, cutoff, limit, now, ttl),
        )
        .await
        .map_err(|_| {
            RateLimitError::StoreUnavailable(format!(
                "prune-count-add timed out after {:?}",
                self.store_timeout
            ))
        })??;

        if decision == Decision::Denied {
            debug!(key = %key, limit, "rate limit exceeded");
        }

        Ok(decision)
    }

    /// Like [`check_and_record`](Self::check_and_record), but resolves
    /// `StoreUnavailable` according to `policy`. `InvalidArgument` still
    /// propagates.
    pub async fn check_with_policy(
        &self,
        key: &RateLimitKey,
        limit: u32,
        window_seconds: f64,
        now: f64,
        policy: FailPolicy,
    ) -> Result<Decision> {
        match self.check_and_record(key, limit, window_seconds, now).await {
            Err(RateLimitError::StoreUnavailable(reason)) => {
                let decision = match policy {
                    FailPolicy::Open => Decision::Allowed,
                    FailPolicy::Closed => Decision::Denied,
                };
                warn!(key = %key, %reason, ?policy, ?decision, "counting store unavailable, applying fail policy");
                Ok(decision)
            }
            other => other,
        }
    }

    /// Number of requests currently recorded for `key` within the trailing
    /// window ending at `now`.
    pub async fn window_count(
        &self,
        key: &RateLimitKey,
        window_seconds: f64,
        now: f64,
    ) -> Result<u64> {
        if !(window_seconds > 0.0) || !window_seconds.is_finite() {
            return Err(RateLimitError::InvalidArgument(format!(
                "window_seconds must be a positive finite number, got {window_seconds}"
            )));
        }
        self.store
            .count_in_window(&key.storage_key(), now - window_seconds)
            .await
    }

    /// Drop all recorded requests for `key`.
    pub async fn reset(&self, key: &RateLimitKey) -> Result<()> {
        self.store.reset(&key.storage_key()).await
    }
}

fn validate_args(key: &RateLimitKey, limit: u32, window_seconds: f64) -> Result<()> {
    if key.caller.is_empty() {
        return Err(RateLimitError::InvalidArgument(
            "key caller must not be empty".to_string(),
        ));
    }
    if limit == 0 {
        return Err(RateLimitError::InvalidArgument(
            "limit must be a positive integer".to_string(),
        ));
    }
    if !(window_seconds > 0.0) || !window_seconds.is_finite() {
        return Err(RateLimitError::InvalidArgument(format!(
            "window_seconds must be a positive finite number, got {window_seconds}"
        )));
    }
    Ok(())
}
