use std::sync::Arc;

use axum::{Router, routing::get};

use crate::app::services::AppServices;

pub mod orders;
pub mod pages;
pub mod products;
pub mod profile;
pub mod rbac;
pub mod system;

/// Router for every `/api` endpoint and guarded page.
pub fn router(services: &Arc<AppServices>) -> Router {
    Router::new()
        .route("/api/whoami", get(system::whoami))
        .nest("/api/products", products::router(services))
        .nest("/api/orders", orders::router(services))
        .nest("/api/profile", profile::router(services))
        .nest("/api/admin/rbac", rbac::router(services))
        .merge(pages::router(services))
}
