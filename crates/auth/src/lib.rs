//! `storegate-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: sessions and
//! profiles are reached through the [`SessionProvider`] and [`ProfileStore`]
//! traits, and every decision is a plain function of the resolved
//! [`Principal`].

pub mod authorize;
pub mod claims;
pub mod guard;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod profile;
pub mod resolver;
pub mod roles;
pub mod session;

pub use authorize::{
    AccessRequirements, AuthorizationExplanation, AuthzError, RbacRegistry, authorize,
    explain_authorization,
};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use guard::{GuardOptions, GuardResult, UNAUTHORIZED_PATH, evaluate_guard, guard_route};
pub use permissions::{Permission, UnknownPermission};
pub use policy::{
    effective_permissions, has_all_permissions, has_any_permission, has_permission,
    is_role_at_least, missing_permissions, role_permissions,
};
pub use principal::{Principal, PrincipalId};
pub use profile::{InMemoryProfileStore, Profile, ProfileError, ProfileStore};
pub use resolver::{PrincipalResolver, ResolveError};
pub use roles::{Role, UnknownRole};
pub use session::{
    InMemorySessionProvider, JwtSessionProvider, SessionError, SessionHandle, SessionProvider,
    SessionUser,
};
