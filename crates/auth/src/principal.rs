use serde::{Deserialize, Serialize};

use crate::{Permission, Profile, Role};

/// Identity of an authenticated principal, as issued by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A fully resolved principal for authorization decisions.
///
/// Built once per request by the [`PrincipalResolver`](crate::PrincipalResolver)
/// and then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

impl Principal {
    /// A principal with an empty profile.
    pub fn new(id: impl Into<PrincipalId>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            first_name: String::new(),
            last_name: String::new(),
            avatar_url: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.first_name = profile.first_name;
        self.last_name = profile.last_name;
        self.avatar_url = profile.avatar_url;
        self
    }

    /// `"First Last"`, falling back to the email when no name is on file.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        crate::has_permission(self.role, permission)
    }

    pub fn is_at_least(&self, role: Role) -> bool {
        crate::is_role_at_least(self.role, role)
    }
}
