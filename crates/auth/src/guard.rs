//! Page-level access decisions.
//!
//! The guard only decides. Turning a denial into a redirect is the
//! transport's job.

use serde::Serialize;

use crate::{
    AccessRequirements, AuthzError, Permission, Principal, PrincipalResolver, Role,
    SessionHandle, authorize,
};

pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOptions {
    pub required_role: Option<Role>,
    pub required_permissions: Vec<Permission>,
    pub allowed_roles: Option<Vec<Role>>,
    pub require_auth: bool,
    /// Where unauthenticated callers are sent.
    pub redirect_to: String,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            required_role: None,
            required_permissions: Vec::new(),
            allowed_roles: None,
            require_auth: true,
            redirect_to: "/login".to_string(),
        }
    }
}

impl GuardOptions {
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn moderator() -> Self {
        Self {
            required_role: Some(Role::Moderator),
            ..Self::default()
        }
    }

    pub fn admin() -> Self {
        Self {
            required_role: Some(Role::Admin),
            ..Self::default()
        }
    }

    pub fn public() -> Self {
        Self {
            require_auth: false,
            ..Self::default()
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.required_permissions.extend(permissions);
        self
    }

    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }

    fn requirements(&self) -> AccessRequirements {
        AccessRequirements {
            require_auth: self.require_auth,
            required_role: self.required_role,
            required_permissions: self.required_permissions.clone(),
            allowed_roles: self.allowed_roles.clone(),
            allow_self: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardResult {
    pub allowed: bool,
    pub principal: Option<Principal>,
    pub redirect_to: Option<String>,
    pub error: Option<String>,
}

impl GuardResult {
    fn allow(principal: Option<Principal>) -> Self {
        Self {
            allowed: true,
            principal,
            redirect_to: None,
            error: None,
        }
    }

    fn deny(principal: Option<Principal>, redirect_to: &str, err: &AuthzError) -> Self {
        Self {
            allowed: false,
            principal,
            redirect_to: Some(redirect_to.to_string()),
            error: Some(err.to_string()),
        }
    }
}

/// Decide whether `principal` may view a page guarded by `options`.
pub fn evaluate_guard(principal: Option<Principal>, options: &GuardOptions) -> GuardResult {
    let outcome = authorize(principal.as_ref(), &options.requirements(), None);
    match outcome {
        Ok(()) => GuardResult::allow(principal),
        Err(err @ AuthzError::NotAuthenticated) => {
            tracing::debug!(redirect_to = %options.redirect_to, "page guard: not authenticated");
            GuardResult::deny(None, &options.redirect_to, &err)
        }
        Err(err) => {
            tracing::debug!(error = %err, "page guard: access denied");
            GuardResult::deny(principal, UNAUTHORIZED_PATH, &err)
        }
    }
}

pub async fn guard_route(
    resolver: &PrincipalResolver,
    session: &SessionHandle,
    options: &GuardOptions,
) -> GuardResult {
    let principal = resolver.resolve_or_deny(session).await;
    evaluate_guard(principal, options)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{InMemorySessionProvider, SessionUser};

    fn who(role: Role) -> Option<Principal> {
        Some(Principal::new("u1", "u1@shop.test", role))
    }

    #[test]
    fn anonymous_goes_to_login() {
        let r = evaluate_guard(None, &GuardOptions::authenticated());
        assert!(!r.allowed);
        assert_eq!(r.redirect_to.as_deref(), Some("/login"));

        let r = evaluate_guard(None, &GuardOptions::admin().redirect_to("/signin"));
        assert_eq!(r.redirect_to.as_deref(), Some("/signin"));
    }

    #[test]
    fn low_role_goes_to_unauthorized() {
        let r = evaluate_guard(who(Role::Customer), &GuardOptions::moderator());
        assert!(!r.allowed);
        assert_eq!(r.redirect_to.as_deref(), Some(UNAUTHORIZED_PATH));

        let r = evaluate_guard(
            who(Role::Moderator),
            &GuardOptions::authenticated().with_permissions([Permission::SettingsManage]),
        );
        assert_eq!(r.redirect_to.as_deref(), Some(UNAUTHORIZED_PATH));
    }

    #[test]
    fn allowed_roles_whitelist_applies() {
        let opts = GuardOptions {
            allowed_roles: Some(vec![Role::Moderator]),
            ..GuardOptions::default()
        };
        assert!(!evaluate_guard(who(Role::Admin), &opts).allowed);
        assert!(evaluate_guard(who(Role::Moderator), &opts).allowed);
    }

    #[test]
    fn public_pages() {
        assert!(evaluate_guard(None, &GuardOptions::public()).allowed);

        let with_req = GuardOptions::public().with_permissions([Permission::AnalyticsRead]);
        let r = evaluate_guard(None, &with_req);
        assert!(!r.allowed);
        assert_eq!(r.redirect_to.as_deref(), Some("/login"));
    }

    #[test]
    fn admin_passes_and_keeps_principal() {
        let r = evaluate_guard(who(Role::Admin), &GuardOptions::admin());
        assert!(r.allowed);
        assert_eq!(r.principal.map(|p| p.role), Some(Role::Admin));
    }

    #[tokio::test]
    async fn guard_route_resolves_session() {
        let sessions = InMemorySessionProvider::new();
        sessions.insert("t", SessionUser::new("u1", "u1@shop.test").with_app_role("moderator"));
        let resolver = PrincipalResolver::new(Arc::new(sessions));

        let r = guard_route(&resolver, &SessionHandle::bearer("t"), &GuardOptions::moderator()).await;
        assert!(r.allowed);
        let r = guard_route(&resolver, &SessionHandle::anonymous(), &GuardOptions::moderator()).await;
        assert_eq!(r.redirect_to.as_deref(), Some("/login"));
    }
}
