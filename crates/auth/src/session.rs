//! Session lookup.
//!
//! A [`SessionHandle`] carries whatever the transport extracted from the
//! request (currently a bearer access token). A [`SessionProvider`] turns it
//! into the authenticated [`SessionUser`], or `None` for anonymous callers.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::Value;
use thiserror::Error;

use crate::claims::{SessionClaims, validate_claims};

/// Request-scoped session credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionHandle {
    access_token: Option<String>,
}

impl SessionHandle {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl core::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Authenticated user as reported by the session provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub user_metadata: HashMap<String, Value>,
    pub app_metadata: HashMap<String, Value>,
}

impl SessionUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            user_metadata: HashMap::new(),
            app_metadata: HashMap::new(),
        }
    }

    pub fn with_app_role(mut self, role: &str) -> Self {
        self.app_metadata
            .insert("role".to_string(), Value::String(role.to_string()));
        self
    }

    /// Raw role claim. `app_metadata.role` wins over `user_metadata.role`.
    pub fn role_claim(&self) -> Option<&str> {
        self.app_metadata
            .get("role")
            .and_then(Value::as_str)
            .or_else(|| self.user_metadata.get("role").and_then(Value::as_str))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed session: {0}")]
    Malformed(String),

    #[error("session provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `Ok(None)` when the handle carries no valid session.
    async fn get_user(&self, session: &SessionHandle) -> Result<Option<SessionUser>, SessionError>;
}

/// Verifies HS256-signed access tokens locally.
pub struct JwtSessionProvider {
    key: DecodingKey,
    audience: Option<String>,
}

impl JwtSessionProvider {
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            audience: None,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims` against an explicit clock.
        validation.validate_exp = false;
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }
        validation
    }

    /// Decode and verify `token` as of `now` (Unix seconds).
    pub fn decode_at(&self, token: &str, now: i64) -> Result<Option<SessionUser>, SessionError> {
        let data = match decode::<SessionClaims>(token, &self.key, &self.validation()) {
            Ok(data) => data,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidAudience
                    | ErrorKind::ExpiredSignature
                    | ErrorKind::ImmatureSignature
                    | ErrorKind::InvalidAlgorithm => {
                        tracing::debug!(error = %e, "rejected session token");
                        Ok(None)
                    }
                    _ => Err(SessionError::Malformed(e.to_string())),
                };
            }
        };

        if let Err(e) = validate_claims(&data.claims, now) {
            tracing::debug!(error = %e, sub = %data.claims.sub, "session token outside its time window");
            return Ok(None);
        }

        Ok(Some(data.claims.into_user()))
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn get_user(&self, session: &SessionHandle) -> Result<Option<SessionUser>, SessionError> {
        match session.access_token() {
            None => Ok(None),
            Some(token) => self.decode_at(token, chrono::Utc::now().timestamp()),
        }
    }
}

/// Opaque-token session table, for tests and local development.
#[derive(Debug, Default)]
pub struct InMemorySessionProvider {
    sessions: RwLock<HashMap<String, SessionUser>>,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, user: SessionUser) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(token.into(), user);
        }
    }

    pub fn revoke(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(token);
        }
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn get_user(&self, session: &SessionHandle) -> Result<Option<SessionUser>, SessionError> {
        let Some(token) = session.access_token() else {
            return Ok(None);
        };
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SessionError::Unavailable("session table poisoned".to_string()))?;
        Ok(sessions.get(token).cloned())
    }
}
