use axum::http::Method;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use storegate_auth::{Principal, PrincipalId, Role};

/// Per-invocation context handed to an action handler.
///
/// Created once after every check has passed; `user_id` and `user_role`
/// are `None` for anonymous callers of public actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    pub user_id: Option<PrincipalId>,
    pub user_role: Option<Role>,
    pub timestamp: DateTime<Utc>,
    pub action_name: String,
    pub request_id: Uuid,
}

impl ActionContext {
    pub(crate) fn new(action_name: &str, request_id: Uuid, principal: Option<&Principal>) -> Self {
        Self {
            user_id: principal.map(|p| p.id.clone()),
            user_role: principal.map(|p| p.role),
            timestamp: Utc::now(),
            action_name: action_name.to_string(),
            request_id,
        }
    }
}

/// [`ActionContext`] plus the HTTP request it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContext {
    pub action: ActionContext,
    pub method: Method,
    pub path: String,
    pub client_ip: String,
}
