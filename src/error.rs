use thiserror::Error;

/// Errors produced by rate limit evaluation.
///
/// The taxonomy is deliberately small: either the caller passed arguments
/// the limiter cannot work with, or the counting store could not complete
/// the atomic evaluation. The limiter never converts a store failure into
/// an implicit Allowed or Denied on its own; see
/// [`FailPolicy`](crate::limiter::FailPolicy) for the explicit opt-in.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Caller misuse: empty key, non-positive limit or window. Not retryable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The counting store could not be reached, timed out, or could not
    /// guarantee the atomic prune-count-add. Transient; retry policy is the
    /// caller's concern.
    #[error("counting store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<redis::RedisError> for RateLimitError {
    fn from(err: redis::RedisError) -> Self {
        RateLimitError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RateLimitError>;
