//! RBAC audit endpoints (admin only).
//!
//! Visibility into the role table and into individual decisions, to answer
//! "why was this request denied?".

use std::sync::Arc;

use axum::{Router, http::Method};
use serde_json::{Value, json};

use storegate_auth::{Permission, RbacRegistry, Role, explain_authorization};
use storegate_core::{AnyInput, ValidationError, ValidationIssue};

use crate::app::dto::{self, ExplainQuery};
use crate::app::services::AppServices;
use crate::config::ActionConfig;
use crate::context::RouteContext;
use crate::error::ActionError;

pub fn router(services: &Arc<AppServices>) -> Router {
    let gate = &services.gate;

    // GET /api/admin/rbac/roles
    let roles = gate.route(
        Method::GET,
        ActionConfig::admin("rbac.roles"),
        AnyInput,
        |_: Value, _ctx: RouteContext| async move {
            Ok(json!({ "roles": RbacRegistry::new().roles }))
        },
    );

    // GET /api/admin/rbac/permissions
    let permissions = gate.route(
        Method::GET,
        ActionConfig::admin("rbac.permissions"),
        AnyInput,
        |_: Value, _ctx: RouteContext| async move {
            Ok(json!({ "permissions": RbacRegistry::new().permissions }))
        },
    );

    // GET /api/admin/rbac/explain?role=X&permission=Y
    let explain = gate.route(
        Method::GET,
        ActionConfig::admin("rbac.explain"),
        dto::explain_schema(),
        |q: ExplainQuery, _ctx: RouteContext| async move {
            let (role, permission) = parse_explain(&q)?;
            Ok(json!({ "explanation": explain_authorization(role, permission) }))
        },
    );

    Router::new()
        .route("/roles", roles.into_method_router())
        .route("/permissions", permissions.into_method_router())
        .route("/explain", explain.into_method_router())
}

fn parse_explain(q: &ExplainQuery) -> Result<(Role, Permission), ActionError> {
    let mut issues = Vec::new();
    let role = q
        .role
        .parse::<Role>()
        .map_err(|e| issues.push(ValidationIssue::new("role", e.to_string())))
        .ok();
    let permission = q
        .permission
        .parse::<Permission>()
        .map_err(|e| issues.push(ValidationIssue::new("permission", e.to_string())))
        .ok();
    match (role, permission) {
        (Some(r), Some(p)) => Ok((r, p)),
        _ => Err(ValidationError::new(issues).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explain_query_reports_each_bad_field() {
        let err = parse_explain(&ExplainQuery {
            role: "root".into(),
            permission: "orders:nuke".into(),
        })
        .unwrap_err();
        let ActionError::Validation(v) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(v.issues().len(), 2);
        assert_eq!(v.messages_for("role"), vec!["unknown role 'root'"]);

        let ok = parse_explain(&ExplainQuery {
            role: "moderator".into(),
            permission: "reviews:moderate".into(),
        })
        .unwrap();
        assert_eq!(ok, (Role::Moderator, Permission::ReviewsModerate));
    }
}
