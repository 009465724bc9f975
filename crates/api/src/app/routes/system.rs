use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::services::AppServices;
use crate::error::ActionError;
use crate::request::RequestHandle;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Response {
    let request = RequestHandle::from_headers(&headers);
    match services.gate.resolver().resolve_or_deny(&request.session).await {
        Some(principal) => Json(json!({
            "id": principal.id,
            "email": principal.email,
            "role": principal.role,
            "displayName": principal.display_name(),
        }))
        .into_response(),
        None => ActionError::NotAuthenticated.into_response(),
    }
}
