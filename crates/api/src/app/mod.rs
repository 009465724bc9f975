//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: session, profile and rate-limit wiring plus the demo catalog
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and their validation schemas

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::ServerConfig;

pub mod dto;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &ServerConfig) -> anyhow::Result<Router> {
    Ok(router(AppServices::from_config(config)?))
}

/// Router over already-wired services.
pub fn router(services: AppServices) -> Router {
    let services = Arc::new(services);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router(&services))
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
