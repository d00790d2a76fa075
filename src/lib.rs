//! Distributed sliding-window rate limiting.
//!
//! Decides admit/deny for a request given a caller identity and a fixed
//! quota over a trailing time window, with the guarantee that no caller
//! exceeds its quota within any trailing window even when many serving
//! processes share one counting store. The limiter itself is stateless;
//! the store performs the prune-count-add atomically.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ratekeeper::{RateLimitKey, RateLimiter, RedisStore};
//!
//! # async fn demo() -> ratekeeper::Result<()> {
//! let store = Arc::new(RedisStore::connect("redis://127.0.0.1:6379").await?);
//! let limiter = RateLimiter::new(store);
//!
//! let key = RateLimitKey::new("client-42", "search");
//! let now = 1_700_000_000.0;
//! let decision = limiter.check_and_record(&key, 100, 60.0, now).await?;
//! if decision.is_allowed() {
//!     // serve the request
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod limiter;
pub mod store;

pub use config::LimiterConfig;
pub use error::{RateLimitError, Result};
pub use key::RateLimitKey;
pub use limiter::{Decision, FailPolicy, RateLimiter};
pub use store::{CountingStore, MemoryStore, RedisStore};
