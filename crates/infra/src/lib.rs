//! Infrastructure adapters: shared rate-limit counters and profile storage.

pub mod profiles;
pub mod ratelimit;

pub use profiles::PostgresProfileStore;
#[cfg(feature = "redis")]
pub use ratelimit::RedisRateLimitStore;
