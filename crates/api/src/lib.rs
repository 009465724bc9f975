//! HTTP surface of storegate: the secure action / API-route pipelines, the
//! page guard middleware and the demo storefront router.

pub mod action;
pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod guard;
mod pipeline;
pub mod request;
pub mod route;

#[cfg(test)]
mod test_support;

pub use action::SecureAction;
pub use config::{ActionConfig, ConfigError, RateLimitPolicy, ServerConfig};
pub use context::{ActionContext, RouteContext};
pub use error::{ActionError, ErrorKind};
pub use gate::SecureGate;
pub use guard::{PageGuard, denial_response, require_page_access};
pub use request::RequestHandle;
pub use route::{SecureRoute, reject_other_methods};
