//! Fixtures shared by the pipeline unit tests.

use std::sync::Arc;

use storegate_auth::{InMemorySessionProvider, PrincipalResolver, SessionHandle, SessionUser};
use storegate_core::RateLimiter;

use crate::gate::SecureGate;
use crate::request::RequestHandle;

/// Gate whose sessions are the opaque tokens `customer` (u1), `customer2`
/// (u2), `moderator` (m1) and `admin` (a1).
pub(crate) fn gate() -> SecureGate {
    let sessions = InMemorySessionProvider::new();
    sessions.insert("customer", SessionUser::new("u1", "u1@shop.test"));
    sessions.insert("customer2", SessionUser::new("u2", "u2@shop.test"));
    sessions.insert(
        "moderator",
        SessionUser::new("m1", "m1@shop.test").with_app_role("moderator"),
    );
    sessions.insert("admin", SessionUser::new("a1", "a1@shop.test").with_app_role("admin"));
    SecureGate::new(PrincipalResolver::new(Arc::new(sessions)), RateLimiter::in_memory())
}

pub(crate) fn as_user(token: &str) -> RequestHandle {
    RequestHandle::new(SessionHandle::bearer(token), "198.51.100.7")
}

pub(crate) fn anonymous() -> RequestHandle {
    RequestHandle::anonymous("198.51.100.7")
}
