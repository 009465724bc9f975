//! Page guard over HTTP.
//!
//! A denied [`GuardResult`] becomes a `302 Found` to its redirect target.
//! [`require_page_access`] runs the guard in front of a page handler and
//! hands the resolved [`Principal`] down through request extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use storegate_auth::{GuardOptions, GuardResult, Principal, UNAUTHORIZED_PATH};

use crate::gate::SecureGate;
use crate::request::RequestHandle;

/// Redirect for a denied guard result; `None` when access is allowed.
pub fn denial_response(result: &GuardResult) -> Option<Response> {
    if result.allowed {
        return None;
    }
    let location = result.redirect_to.as_deref().unwrap_or(UNAUTHORIZED_PATH);
    Some((StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response())
}

/// Middleware state: the gate plus the page's guard options.
#[derive(Debug, Clone)]
pub struct PageGuard {
    gate: SecureGate,
    options: Arc<GuardOptions>,
}

impl PageGuard {
    pub fn new(gate: SecureGate, options: GuardOptions) -> Self {
        Self {
            gate,
            options: Arc::new(options),
        }
    }
}

pub async fn require_page_access(
    State(guard): State<PageGuard>,
    mut req: Request,
    next: Next,
) -> Response {
    let request = RequestHandle::from_headers(req.headers());
    let result = guard.gate.guard(&request.session, &guard.options).await;

    if let Some(denied) = denial_response(&result) {
        tracing::info!(
            path = %req.uri().path(),
            redirect_to = ?result.redirect_to,
            "page access denied"
        );
        return denied;
    }

    if let Some(principal) = result.principal {
        req.extensions_mut().insert::<Principal>(principal);
    }
    next.run(req).await
}
