use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::SessionUser;

/// Session token claims (transport-agnostic).
///
/// The minimal set of claims expected once an access token has been decoded.
/// Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / user identifier.
    pub sub: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Expiration timestamp.
    pub exp: i64,

    /// Issued-at timestamp.
    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub aud: Option<String>,

    #[serde(default)]
    pub user_metadata: HashMap<String, Value>,

    /// Provider-controlled metadata. Carries the trusted `role` claim.
    #[serde(default)]
    pub app_metadata: HashMap<String, Value>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of session claims.
///
/// Signature verification happens in the session provider before this runs.
pub fn validate_claims(claims: &SessionClaims, now: i64) -> Result<(), TokenValidationError> {
    if let Some(iat) = claims.iat {
        if claims.exp <= iat {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
        if now < iat {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

impl SessionClaims {
    pub fn into_user(self) -> SessionUser {
        SessionUser {
            id: self.sub,
            email: self.email,
            user_metadata: self.user_metadata,
            app_metadata: self.app_metadata,
        }
    }
}
