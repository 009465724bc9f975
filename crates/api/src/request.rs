//! Transport facts the pipelines need from a request.

use axum::http::{HeaderMap, header};
use uuid::Uuid;

use storegate_auth::SessionHandle;

/// Cookie carrying the access token for browser sessions.
pub const SESSION_COOKIE: &str = "sb-access-token";

pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone)]
pub struct RequestHandle {
    pub session: SessionHandle,
    pub client_ip: String,
    pub request_id: Uuid,
}

impl RequestHandle {
    pub fn new(session: SessionHandle, client_ip: impl Into<String>) -> Self {
        Self {
            session,
            client_ip: client_ip.into(),
            request_id: Uuid::now_v7(),
        }
    }

    pub fn anonymous(client_ip: impl Into<String>) -> Self {
        Self::new(SessionHandle::anonymous(), client_ip)
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let session = bearer_token(headers)
            .or_else(|| cookie(headers, SESSION_COOKIE))
            .map(SessionHandle::bearer)
            .unwrap_or_default();
        Self::new(session, client_ip(headers))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.to_string())
}

/// Client address for rate-limit keys.
///
/// Assumes one trusted reverse proxy in front of the service that appends the
/// peer address to `x-forwarded-for` (or sets `x-real-ip`). Only the last hop
/// is used; earlier hops are whatever the client sent. Without either header
/// the result is `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .last()
        .and_then(|v| v.rsplit(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    forwarded
        .or_else(real)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
