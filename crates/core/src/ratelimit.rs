//! Fixed-window rate limiting.
//!
//! A window starts at the first request for a key and lasts `window`; every
//! request in the window increments the counter and is allowed while
//! `count <= max`. The first request after `reset_at` opens a new window.
//!
//! Windows are fixed per key, not sliding: a client can issue up to `2 × max`
//! requests around a window boundary.
//!
//! Counters live behind [`RateLimitStore`] so a process-local map and a shared
//! cache are interchangeable; the limiter itself holds no state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Counter state of one key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub count: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitRecord {
    /// Record for the first request of a new window.
    pub fn open(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: window_end(now, window),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),

    #[error("rate limit store returned corrupt data for key '{key}': {detail}")]
    Corrupt { key: String, detail: String },
}

/// Storage for rate-limit counters.
///
/// `increment` must be atomic with respect to concurrent callers on the same
/// key: it opens a fresh window when none exists or the current one has
/// expired, and bumps the counter otherwise.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, RateLimitError>;

    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitRecord, RateLimitError>;

    /// Forget a key (its next request opens a new window).
    async fn clear(&self, key: &str) -> Result<(), RateLimitError>;
}

/// Key count above which `increment` drops expired windows.
pub const PRUNE_THRESHOLD: usize = 10_000;

/// Process-local store for single-instance deployments and tests.
///
/// Expired windows are dropped once the map holds [`PRUNE_THRESHOLD`] keys,
/// so memory is bounded by the number of keys active within one window.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    inner: Mutex<HashMap<String, RateLimitRecord>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every window that has expired at `now`; returns how many went.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        match self.inner.lock() {
            Ok(mut map) => prune(&mut map, now),
            Err(_) => 0,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, RateLimitRecord>>, RateLimitError> {
        self.inner
            .lock()
            .map_err(|_| RateLimitError::Unavailable("lock poisoned".to_string()))
    }
}

fn prune(map: &mut HashMap<String, RateLimitRecord>, now: DateTime<Utc>) -> usize {
    let before = map.len();
    map.retain(|_, record| !record.is_expired(now));
    before - map.len()
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, RateLimitError> {
        Ok(self.lock()?.get(key).copied())
    }

    async fn increment(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitRecord, RateLimitError> {
        let mut map = self.lock()?;

        if map.len() >= PRUNE_THRESHOLD && !map.contains_key(key) {
            let pruned = prune(&mut map, now);
            tracing::debug!(pruned, remaining = map.len(), "pruned expired rate limit windows");
        }

        let record = match map.get_mut(key) {
            Some(record) if !record.is_expired(now) => {
                record.count = record.count.saturating_add(1);
                *record
            }
            _ => {
                let record = RateLimitRecord::open(now, window);
                map.insert(key.to_string(), record);
                record
            }
        };

        Ok(record)
    }

    async fn clear(&self, key: &str) -> Result<(), RateLimitError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests counted in the current window, including this one.
    pub count: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }

    /// Whole seconds until the window resets (at least 1 when denied).
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        let secs = millis.div_ceil(1000);
        if self.allowed { secs } else { secs.max(1) }
    }
}

/// Fixed-window limiter over an injected store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl core::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRateLimitStore::new()))
    }

    /// `true` if the request identified by `key` is within its quota.
    pub async fn check(&self, key: &str, max: u64, window: Duration) -> bool {
        self.check_at(key, max, window, Utc::now()).await.allowed
    }

    /// Count one request at `now` and decide.
    ///
    /// Store failures fail open: the request is allowed and the failure logged.
    pub async fn check_at(
        &self,
        key: &str,
        max: u64,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        match self.store.increment(key, window, now).await {
            Ok(record) => RateLimitDecision {
                allowed: record.count <= max,
                count: record.count,
                limit: max,
                reset_at: record.reset_at,
            },
            Err(e) => {
                tracing::warn!(key, error = %e, "rate limit store failed; allowing request");
                RateLimitDecision {
                    allowed: true,
                    count: 0,
                    limit: max,
                    reset_at: window_end(now, window),
                }
            }
        }
    }

    /// Current state for `key` without counting a request.
    pub async fn peek(
        &self,
        key: &str,
        max: u64,
        now: DateTime<Utc>,
    ) -> Option<RateLimitDecision> {
        let record = self.store.get(key).await.ok().flatten()?;
        if record.is_expired(now) {
            return None;
        }
        Some(RateLimitDecision {
            allowed: record.count < max,
            count: record.count,
            limit: max,
            reset_at: record.reset_at,
        })
    }

    pub async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        self.store.clear(key).await
    }
}

fn window_end(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
