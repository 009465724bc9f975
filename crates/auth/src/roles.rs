use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role used for RBAC.
///
/// Roles form a total order: `Admin` inherits everything `Moderator` holds,
/// which inherits everything `Customer` holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Moderator,
    Admin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Roles whose permissions this role inherits.
    pub fn inherits(&self) -> &'static [Role] {
        match self {
            Role::Customer => &[],
            Role::Moderator => &[Role::Customer],
            Role::Admin => &[Role::Moderator, Role::Customer],
        }
    }

    /// Map a session role claim to a role.
    ///
    /// A missing claim means a regular customer. An unrecognised claim also
    /// yields `Customer`, the least-privileged role.
    pub fn from_claim(claim: Option<&str>) -> Role {
        match claim {
            None => Role::Customer,
            Some(raw) => raw.parse().unwrap_or_else(|e: UnknownRole| {
                tracing::warn!(error = %e, "unrecognised role claim; using customer");
                Role::Customer
            }),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" moderator ".parse::<Role>().unwrap(), Role::Moderator);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn claim_defaults_to_customer() {
        assert_eq!(Role::from_claim(None), Role::Customer);
        assert_eq!(Role::from_claim(Some("root")), Role::Customer);
        assert_eq!(Role::from_claim(Some("admin")), Role::Admin);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), "\"moderator\"");
        let role: Role = serde_json::from_str("\"customer\"").unwrap();
        assert_eq!(role, Role::Customer);
    }
}
