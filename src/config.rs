use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{RateLimitError, Result};
use crate::limiter::FailPolicy;

/// Limiter configuration.
///
/// Loadable from the environment (see [`LimiterConfig::from_env`]) or
/// deserialized from a config file; durations accept human-readable forms
/// like `"60s"` or `"250ms"`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LimiterConfig {
    /// Counting store connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Quota applied when the caller does not pass an explicit limit.
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, message = "default_limit must be a positive integer"))]
    pub default_limit: u32,

    /// Trailing window length.
    #[serde(default = "default_window", with = "humantime_serde")]
    pub default_window: Duration,

    /// Budget for one atomic store round-trip. Calls exceeding it surface
    /// as `StoreUnavailable`.
    #[serde(default = "default_store_timeout", with = "humantime_serde")]
    pub store_timeout: Duration,

    /// How requests are treated when the store cannot answer. Only applied
    /// through `check_with_policy`; the plain check always surfaces the
    /// error.
    #[serde(default = "default_fail_policy")]
    pub fail_policy: FailPolicy,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_limit() -> u32 {
    100
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_fail_policy() -> FailPolicy {
    FailPolicy::Closed
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            default_limit: default_limit(),
            default_window: default_window(),
            store_timeout: default_store_timeout(),
            fail_policy: default_fail_policy(),
        }
    }
}

impl LimiterConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults. A `.env` file in the working directory is picked up
    /// first.
    ///
    /// Variables: `REDIS_URL`, `DEFAULT_RATE_LIMIT`,
    /// `DEFAULT_WINDOW_SECS`, `STORE_TIMEOUT_MS`, `FAIL_POLICY`
    /// (`open`/`closed`).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = env::var("REDIS_URL") {
            config.redis_url = url;
        }
        if let Ok(raw) = env::var("DEFAULT_RATE_LIMIT") {
            config.default_limit = raw.parse().map_err(|_| {
                RateLimitError::InvalidArgument(format!("DEFAULT_RATE_LIMIT '{raw}' is not an integer"))
            })?;
        }
        if let Ok(raw) = env::var("DEFAULT_WINDOW_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                RateLimitError::InvalidArgument(format!("DEFAULT_WINDOW_SECS '{raw}' is not an integer"))
            })?;
            config.default_window = Duration::from_secs(secs);
        }
        if let Ok(raw) = env::var("STORE_TIMEOUT_MS") {
            let ms: u64 = raw.parse().map_err(|_| {
                RateLimitError::InvalidArgument(format!("STORE_TIMEOUT_MS '{raw}' is not an integer"))
            })?;
            config.store_timeout = Duration::from_millis(ms);
        }
        if let Ok(raw) = env::var("FAIL_POLICY") {
            config.fail_policy = raw.parse()?;
        }

        config.check()?;
        Ok(config)
    }

    /// Validate field constraints.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| RateLimitError::InvalidArgument(e.to_string()))?;
        if self.default_window.is_zero() {
            return Err(RateLimitError::InvalidArgument(
                "default_window must be positive".to_string(),
            ));
        }
        if self.store_timeout.is_zero() {
            return Err(RateLimitError::InvalidArgument(
                "store_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LimiterConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.default_limit, 100);
        assert_eq!(config.default_window, Duration::from_secs(60));
        assert_eq!(config.fail_policy, FailPolicy::Closed);
    }

    #[test]
    fn zero_limit_fails_validation() {
        let config = LimiterConfig {
            default_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.check(),
            Err(RateLimitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_window_fails_validation() {
        let config = LimiterConfig {
            default_window: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.check(),
            Err(RateLimitError::InvalidArgument(_))
        ));
    }

    #[test]
    fn deserializes_humantime_durations() {
        let config: LimiterConfig = serde_json::from_str(
            r#"{
                "redis_url": "redis://store:6379",
                "default_limit": 50,
                "default_window": "30s",
                "store_timeout": "250ms",
                "fail_policy": "open"
            }"#,
        )
        .unwrap();
        assert_eq!(config.redis_url, "redis://store:6379");
        assert_eq!(config.default_window, Duration::from_secs(30));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.fail_policy, FailPolicy::Open);
    }

    // Sole test that touches the process environment; the variable names
    // are not read anywhere else in the suite.
    #[test]
    fn from_env_reads_overrides() {
        env::set_var("REDIS_URL", "redis://elsewhere:6379");
        env::set_var("DEFAULT_RATE_LIMIT", "7");
        env::set_var("DEFAULT_WINDOW_SECS", "30");
        env::set_var("STORE_TIMEOUT_MS", "250");
        env::set_var("FAIL_POLICY", "open");

        let config = LimiterConfig::from_env().unwrap();

        for var in [
            "REDIS_URL",
            "DEFAULT_RATE_LIMIT",
            "DEFAULT_WINDOW_SECS",
            "STORE_TIMEOUT_MS",
            "FAIL_POLICY",
        ] {
            env::remove_var(var);
        }

        assert_eq!(config.redis_url, "redis://elsewhere:6379");
        assert_eq!(config.default_limit, 7);
        assert_eq!(config.default_window, Duration::from_secs(30));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.fail_policy, FailPolicy::Open);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: LimiterConfig = serde_json::from_str(r#"{"default_limit": 5}"#).unwrap();
        assert_eq!(config.default_limit, 5);
        assert_eq!(config.default_window, Duration::from_secs(60));
    }
}
