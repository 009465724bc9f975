use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::{
    Permission, Principal, PrincipalId, Role, effective_permissions, has_permission,
    is_role_at_least, missing_permissions, role_permissions,
};

/// What a protected operation demands of its caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequirements {
    pub require_auth: bool,
    pub required_role: Option<Role>,
    pub required_permissions: Vec<Permission>,
    /// Whitelist of roles; `None` allows every role.
    pub allowed_roles: Option<Vec<Role>>,
    /// Waive the permission check when the caller owns the target resource.
    pub allow_self: bool,
}

impl AccessRequirements {
    /// `true` if deciding requires a resolved principal.
    pub fn needs_principal(&self) -> bool {
        self.require_auth
            || self.required_role.is_some()
            || !self.required_permissions.is_empty()
            || self.allowed_roles.is_some()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    NotAuthenticated,

    #[error("requires role '{required}' (caller is '{actual}')")]
    InsufficientRole { required: Role, actual: Role },

    #[error("role '{actual}' is not allowed here")]
    RoleNotAllowed { actual: Role, allowed: Vec<Role> },

    #[error("missing permissions: {}", join(.missing))]
    InsufficientPermissions { missing: Vec<Permission> },
}

fn join(perms: &[Permission]) -> String {
    perms.iter().map(Permission::as_str).collect::<Vec<_>>().join(", ")
}

/// Check `principal` against `req`.
///
/// Checks run in a fixed order: authentication, minimum role, role
/// whitelist, then permissions. With `allow_self`, a caller whose id equals
/// `owner` skips the permission check only.
///
/// - No IO
/// - No panics
pub fn authorize(
    principal: Option<&Principal>,
    req: &AccessRequirements,
    owner: Option<&PrincipalId>,
) -> Result<(), AuthzError> {
    if !req.needs_principal() {
        return Ok(());
    }
    let Some(principal) = principal else {
        return Err(AuthzError::NotAuthenticated);
    };

    if let Some(required) = req.required_role {
        if !is_role_at_least(principal.role, required) {
            return Err(AuthzError::InsufficientRole {
                required,
                actual: principal.role,
            });
        }
    }

    if let Some(allowed) = &req.allowed_roles {
        if !allowed.contains(&principal.role) {
            return Err(AuthzError::RoleNotAllowed {
                actual: principal.role,
                allowed: allowed.clone(),
            });
        }
    }

    let is_self = req.allow_self && owner.is_some_and(|o| *o == principal.id);
    if !is_self {
        let missing = missing_permissions(principal.role, &req.required_permissions);
        if !missing.is_empty() {
            return Err(AuthzError::InsufficientPermissions { missing });
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub role: Role,
    pub required_permission: Permission,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub effective_permissions: Vec<Permission>,
    pub has_wildcard: bool,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub message: String,
    /// Roles that would be granted the permission.
    pub granting_roles: Vec<Role>,
    pub suggestions: Vec<String>,
}

/// Explain why `role` is (or is not) granted `permission`.
pub fn explain_authorization(role: Role, permission: Permission) -> AuthorizationExplanation {
    let effective: Vec<Permission> = effective_permissions(role).into_iter().collect();
    let has_wildcard = effective.contains(&Permission::All);
    let granted = has_permission(role, permission);

    if granted {
        let reason = if has_wildcard {
            format!("role '{role}' holds the wildcard permission '*'")
        } else if role_permissions(role).contains(&permission) {
            format!("role '{role}' is granted '{permission}' directly")
        } else {
            format!("role '{role}' inherits '{permission}'")
        };
        return AuthorizationExplanation {
            role,
            required_permission: permission,
            granted,
            reason,
            effective_permissions: effective,
            has_wildcard,
            denial_reason: None,
        };
    }

    let granting_roles: Vec<Role> = Role::ALL
        .into_iter()
        .filter(|r| has_permission(*r, permission))
        .collect();
    let suggestions = granting_roles
        .iter()
        .map(|r| format!("Assign the '{r}' role to grant '{permission}'"))
        .collect();

    AuthorizationExplanation {
        role,
        required_permission: permission,
        granted,
        reason: format!("role '{role}' does not hold '{permission}'"),
        effective_permissions: effective,
        has_wildcard,
        denial_reason: Some(DenialReason {
            message: format!("Missing required permission: '{permission}'"),
            granting_roles,
            suggestions,
        }),
    }
}

/// Role definition with its granted permissions (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: Role,
    pub inherits: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub description: &'static str,
}

/// Permission definition (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub name: Permission,
    pub description: String,
    pub category: &'static str,
}

/// Complete view of the role table, for auditing.
#[derive(Debug, Clone, Serialize)]
pub struct RbacRegistry {
    pub roles: Vec<RoleDefinition>,
    pub permissions: BTreeMap<String, PermissionDefinition>,
}

impl RbacRegistry {
    pub fn new() -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| RoleDefinition {
                name: role,
                inherits: role.inherits().to_vec(),
                permissions: role_permissions(role).to_vec(),
                description: role_description(role),
            })
            .collect();

        let permissions = Permission::ALL
            .iter()
            .map(|p| {
                (
                    p.as_str().to_string(),
                    PermissionDefinition {
                        name: *p,
                        description: permission_description(*p),
                        category: if p.is_wildcard() { "system" } else { p.resource() },
                    },
                )
            })
            .collect();

        Self { roles, permissions }
    }
}

impl Default for RbacRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn role_description(role: Role) -> &'static str {
    match role {
        Role::Customer => "Shopper managing their own cart, orders and profile",
        Role::Moderator => "Staff handling orders, reviews and inventory",
        Role::Admin => "Full store administrator with all permissions",
    }
}

fn permission_description(perm: Permission) -> String {
    if perm.is_wildcard() {
        return "Wildcard permission - grants all permissions".to_string();
    }
    let action = match perm.action() {
        "read" => "View",
        "read_own" => "View own",
        "read_all" => "View all",
        "create" => "Create",
        "update" => "Update",
        "update_own" => "Update own",
        "update_status" => "Update status of",
        "cancel_own" => "Cancel own",
        "delete" => "Delete",
        "moderate" => "Moderate",
        "manage" => "Manage",
        "manage_all" => "Manage all",
        other => other,
    };
    format!("{action} {}", perm.resource())
}
