//! Redis-backed rate-limit counters.
//!
//! One Redis string per key holds the counter; the window is the key's TTL.
//! Counting runs as a single Lua script so concurrent instances never lose
//! an increment or leave a counter without expiry.
//!
//! Commands go through one multiplexed [`ConnectionManager`], opened on first
//! use and reconnected by the manager after failures.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use redis::aio::ConnectionManager;
use storegate_core::{RateLimitError, RateLimitRecord, RateLimitStore};
use tokio::sync::OnceCell;

use super::namespaced;

const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('PTTL', KEYS[1]) < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return {count, redis.call('PTTL', KEYS[1])}
";

// A request waiting on Redis is held up by at most one short retry before
// the limiter fails open.
const BACKOFF_BASE: u64 = 2;
const BACKOFF_FACTOR_MS: u64 = 50;
const CONNECT_RETRIES: usize = 1;

pub struct RedisRateLimitStore {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
    increment: redis::Script,
}

impl core::fmt::Debug for RedisRateLimitStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisRateLimitStore")
            .field("connected", &self.manager.initialized())
            .finish_non_exhaustive()
    }
}

impl RedisRateLimitStore {
    /// Parse `redis_url`; no connection is made until the first command.
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(unavailable)?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
            increment: redis::Script::new(INCREMENT_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, RateLimitError> {
        let manager = self
            .manager
            .get_or_try_init(|| {
                ConnectionManager::new_with_backoff(
                    self.client.clone(),
                    BACKOFF_BASE,
                    BACKOFF_FACTOR_MS,
                    CONNECT_RETRIES,
                )
            })
            .await
            .map_err(unavailable)?;
        Ok(manager.clone())
    }
}

fn unavailable(e: redis::RedisError) -> RateLimitError {
    RateLimitError::Unavailable(e.to_string())
}

/// `reset_at` for a counter whose remaining TTL is `ttl_ms`.
fn reset_at(key: &str, now: DateTime<Utc>, ttl_ms: i64) -> Result<DateTime<Utc>, RateLimitError> {
    if ttl_ms < 0 {
        return Err(RateLimitError::Corrupt {
            key: key.to_string(),
            detail: format!("counter has no expiry (pttl {ttl_ms})"),
        });
    }
    Ok(now
        .checked_add_signed(TimeDelta::milliseconds(ttl_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC))
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, RateLimitError> {
        let k = namespaced(key);
        let mut conn = self.connection().await?;
        let (count, ttl_ms): (Option<u64>, i64) = redis::pipe()
            .get(&k)
            .pttl(&k)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        match count {
            None => Ok(None),
            Some(count) => Ok(Some(RateLimitRecord {
                count,
                reset_at: reset_at(key, Utc::now(), ttl_ms)?,
            })),
        }
    }

    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitRecord, RateLimitError> {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.connection().await?;
        let (count, ttl_ms): (u64, i64) = self
            .increment
            .key(namespaced(key))
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(RateLimitRecord {
            count,
            reset_at: reset_at(key, now, ttl_ms)?,
        })
    }

    async fn clear(&self, key: &str) -> Result<(), RateLimitError> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(namespaced(key))
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
