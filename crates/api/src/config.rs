//! Per-action and process configuration.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use storegate_auth::{AccessRequirements, Permission, Role};

pub const DEFAULT_RATE_LIMIT_MAX: u64 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window quota applied per client IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Counter namespace; the client IP is appended.
    pub key: String,
    pub max: u64,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            max: DEFAULT_RATE_LIMIT_MAX,
            window: DEFAULT_RATE_LIMIT_WINDOW,
        }
    }

    pub fn max(mut self, max: u64) -> Self {
        self.max = max;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub(crate) fn key_for(&self, client_ip: &str) -> String {
        format!("{}:{}", self.key, client_ip)
    }
}

/// How one action (or API route) is protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    pub name: String,
    pub require_auth: bool,
    pub required_role: Option<Role>,
    pub required_permissions: Vec<Permission>,
    pub allow_self: bool,
    /// Input key holding the id of the resource owner, for `allow_self`.
    pub owner_key: Option<String>,
    pub rate_limit: Option<RateLimitPolicy>,
}

impl ActionConfig {
    /// Unauthenticated action with no requirements.
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            require_auth: false,
            required_role: None,
            required_permissions: Vec::new(),
            allow_self: false,
            owner_key: None,
            rate_limit: None,
        }
    }

    pub fn authenticated(name: impl Into<String>) -> Self {
        Self::public(name).require_auth(true)
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self::authenticated(name).role(Role::Admin)
    }

    pub fn with_permissions(
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self::authenticated(name).permissions(permissions)
    }

    pub fn require_auth(mut self, require: bool) -> Self {
        self.require_auth = require;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.required_role = Some(role);
        self
    }

    pub fn permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.required_permissions.extend(permissions);
        self
    }

    /// Let the owner of the resource named by `owner_key` skip the permission check.
    pub fn allow_self(mut self, owner_key: impl Into<String>) -> Self {
        self.allow_self = true;
        self.owner_key = Some(owner_key.into());
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = Some(policy);
        self
    }

    pub fn requirements(&self) -> AccessRequirements {
        AccessRequirements {
            require_auth: self.require_auth,
            required_role: self.required_role,
            required_permissions: self.required_permissions.clone(),
            allowed_roles: None,
            allow_self: self.allow_self,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid STOREGATE_BIND_ADDR '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

const DEV_JWT_SECRET: &str = "dev-secret";

/// Process configuration read from the environment.
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
}

impl core::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_audience", &self.jwt_audience)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<set>"))
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl ServerConfig {
    /// In-process defaults: local bind, given secret, no external stores.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            jwt_secret: jwt_secret.into(),
            jwt_audience: None,
            redis_url: None,
            database_url: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("STOREGATE_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_raw.clone(),
                source,
            })?;

        let jwt_secret = get("SESSION_JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("SESSION_JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_audience: get("SESSION_JWT_AUDIENCE"),
            redis_url: get("REDIS_URL"),
            database_url: get("DATABASE_URL"),
        })
    }
}
