//! Role → permission engine.
//!
//! - No IO
//! - No panics
//! - Total over [`Role`]: adding a role without mapping it is a compile error.

use std::collections::BTreeSet;

use crate::{Permission, Role};

/// Permissions granted directly to `role` (inherited ones excluded).
pub fn role_permissions(role: Role) -> &'static [Permission] {
    use Permission::*;

    match role {
        Role::Customer => &[
            ProductsRead,
            CartManage,
            OrdersReadOwn,
            OrdersCreate,
            OrdersCancelOwn,
            ReviewsCreate,
            ProfileReadOwn,
            ProfileUpdateOwn,
        ],
        Role::Moderator => &[
            OrdersReadAll,
            OrdersUpdateStatus,
            ReviewsModerate,
            UsersRead,
            ProductsUpdate,
            InventoryManage,
        ],
        Role::Admin => &[All],
    }
}

/// Permissions held by `role`, including those inherited from lower roles.
pub fn effective_permissions(role: Role) -> BTreeSet<Permission> {
    core::iter::once(role)
        .chain(role.inherits().iter().copied())
        .flat_map(|r| role_permissions(r).iter().copied())
        .collect()
}

/// `true` if `role` holds `permission` directly, by inheritance or through the wildcard.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    core::iter::once(role)
        .chain(role.inherits().iter().copied())
        .flat_map(|r| role_permissions(r).iter())
        .any(|p| p.is_wildcard() || *p == permission)
}

/// `true` if `role` holds at least one of `permissions` (`false` for an empty list).
pub fn has_any_permission(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().any(|p| has_permission(role, *p))
}

/// `true` if `role` holds every one of `permissions` (`true` for an empty list).
pub fn has_all_permissions(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().all(|p| has_permission(role, *p))
}

/// The subset of `permissions` that `role` does not hold, in request order.
pub fn missing_permissions(role: Role, permissions: &[Permission]) -> Vec<Permission> {
    permissions
        .iter()
        .copied()
        .filter(|p| !has_permission(role, *p))
        .collect()
}

/// `true` if `role` is `required` or inherits from it.
pub fn is_role_at_least(role: Role, required: Role) -> bool {
    role == required || role.inherits().contains(&required)
}
