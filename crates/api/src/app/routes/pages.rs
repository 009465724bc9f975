//! Guarded pages.

use std::sync::Arc;

use axum::{Extension, Json, Router, middleware, routing::get};
use serde_json::{Value, json};

use storegate_auth::{GuardOptions, Principal};

use crate::app::services::AppServices;
use crate::guard::{PageGuard, require_page_access};

pub fn router(services: &Arc<AppServices>) -> Router {
    let account = Router::new().route("/account", get(account)).layer(
        middleware::from_fn_with_state(
            PageGuard::new(services.gate.clone(), GuardOptions::authenticated()),
            require_page_access,
        ),
    );

    let admin = Router::new().route("/admin", get(admin_dashboard)).layer(
        middleware::from_fn_with_state(
            PageGuard::new(services.gate.clone(), GuardOptions::admin()),
            require_page_access,
        ),
    );

    Router::new()
        .route("/login", get(|| async { Json(json!({ "page": "login" })) }))
        .route("/unauthorized", get(|| async { Json(json!({ "page": "unauthorized" })) }))
        .merge(account)
        .merge(admin)
}

async fn account(Extension(principal): Extension<Principal>) -> Json<Value> {
    Json(json!({
        "page": "account",
        "displayName": principal.display_name(),
        "email": principal.email,
    }))
}

async fn admin_dashboard(Extension(principal): Extension<Principal>) -> Json<Value> {
    Json(json!({ "page": "admin", "role": principal.role }))
}
