//! Rate-limit counter stores shared across processes.
//!
//! The in-process store lives in `storegate-core`; this module only holds
//! adapters that need a network service.

#[cfg(feature = "redis")]
mod redis_store;

#[cfg(feature = "redis")]
pub use redis_store::RedisRateLimitStore;

/// Prefix applied to every counter key written to a shared store.
pub const KEY_PREFIX: &str = "ratelimit:";

pub(crate) fn namespaced(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}
