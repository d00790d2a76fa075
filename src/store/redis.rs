//! Redis-backed counting store.
//!
//! Window contents live in a sorted set per key, scored by timestamp. The
//! whole prune-count-add sequence runs as one server-side Lua script, so
//! concurrent evaluations of the same key from any number of processes are
//! linearized by Redis: two callers racing at the quota boundary can never
//! both be admitted. Issuing ZREMRANGEBYSCORE, ZCARD and ZADD as separate
//! round-trips would break that guarantee.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use tracing::debug;
use uuid::Uuid;

use super::CountingStore;
use crate::error::Result;
use crate::limiter::Decision;

/// Atomic prune-count-add. KEYS[1] = window key; ARGV = cutoff, limit,
/// now, member, ttl in milliseconds. Returns 1 when admitted, 0 otherwise.
/// The '(' prefix makes the cutoff exclusive: timestamps exactly at
/// `now - window` are still inside the trailing window.
const PRUNE_COUNT_ADD: &str = r#"
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', '(' .. ARGV[1])
local count = redis.call('ZCARD', KEYS[1])
if count < tonumber(ARGV[2]) then
    redis.call('ZADD', KEYS[1], ARGV[3], ARGV[4])
    redis.call('PEXPIRE', KEYS[1], ARGV[5])
    return 1
end
return 0
"#;

pub struct RedisStore {
    connection: MultiplexedConnection,
    script: Script,
}

impl RedisStore {
    /// Connect to the counting store at `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        debug!(redis_url, "connected to counting store");
        Ok(Self {
            connection,
            script: Script::new(PRUNE_COUNT_ADD),
        })
    }

    /// Round-trip health check.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl CountingStore for RedisStore {
    async fn prune_count_add(
        &self,
        key: &str,
        cutoff: f64,
        limit: u32,
        now: f64,
        ttl: Duration,
    ) -> Result<Decision> {
        // Members carry a random suffix so simultaneous requests at the
        // same instant occupy distinct sorted-set entries.
        let member = format!("{}:{}", now, Uuid::new_v4());
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.connection.clone();
        let admitted: i64 = self
            .script
            .key(key)
            .arg(cutoff)
            .arg(limit)
            .arg(now)
            .arg(member)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;

        Ok(if admitted == 1 {
            Decision::Allowed
        } else {
            Decision::Denied
        })
    }

    async fn count_in_window(&self, key: &str, cutoff: f64) -> Result<u64> {
        let mut conn = self.connection.clone();
        let (_removed, count): (i64, u64) = redis::pipe()
            .atomic()
            .cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(format!("({}", cutoff))
            .cmd("ZCARD")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn reset(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
