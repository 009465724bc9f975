//! `storegate-core`: request-level building blocks shared by every pipeline.
//!
//! This crate contains **pure** primitives (no HTTP, no session transport):
//! input sanitization, the schema validation contract and the fixed-window
//! rate limiter with its pluggable store.

pub mod error;
pub mod ratelimit;
pub mod sanitize;
pub mod schema;

pub use error::{ValidationError, ValidationIssue};
pub use ratelimit::{
    InMemoryRateLimitStore, RateLimitDecision, RateLimitError, RateLimitRecord, RateLimitStore,
    RateLimiter,
};
pub use sanitize::{sanitize_str, sanitize_value};
pub use schema::{
    AnyInput, Checks, Dto, FnSchema, Schema, Validate, dto, from_str_or_value, schema_fn,
};
