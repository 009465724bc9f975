//! Pipeline failures and their HTTP envelope.
//!
//! Every failure is rendered as `{ "error", "code", "details"? }` with a
//! status fixed per variant. Unknown failures never expose their message.

use axum::Json;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use storegate_auth::{AuthzError, Permission, Role};
use storegate_core::ValidationError;

/// Coarse failure taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    AuthError,
    PermissionError,
    ValidationError,
    RateLimitError,
    RequestError,
    UnknownError,
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Requires {required} role or higher")]
    InsufficientRole { required: Role, actual: Role },

    #[error("Role '{actual}' is not allowed")]
    RoleNotAllowed { actual: Role, allowed: Vec<Role> },

    #[error("Insufficient permissions")]
    InsufficientPermissions { missing: Vec<Permission> },

    #[error("Validation failed")]
    Validation(#[from] ValidationError),

    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid request body")]
    InvalidRequestBody(String),

    #[error("Method not allowed")]
    MethodNotAllowed { allowed: Vec<Method> },

    #[error("action failed: {action}")]
    Failed { action: String },

    /// Anything a handler raises that is not one of the above.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::NotAuthenticated => ErrorKind::AuthError,
            ActionError::InsufficientRole { .. }
            | ActionError::RoleNotAllowed { .. }
            | ActionError::InsufficientPermissions { .. } => ErrorKind::PermissionError,
            ActionError::Validation(_) => ErrorKind::ValidationError,
            ActionError::RateLimited { .. } => ErrorKind::RateLimitError,
            ActionError::InvalidRequestBody(_) | ActionError::MethodNotAllowed { .. } => {
                ErrorKind::RequestError
            }
            ActionError::Failed { .. } | ActionError::Internal(_) => ErrorKind::UnknownError,
        }
    }

    /// Stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::NotAuthenticated => "NOT_AUTHENTICATED",
            ActionError::InsufficientRole { .. } | ActionError::RoleNotAllowed { .. } => {
                "INSUFFICIENT_ROLE"
            }
            ActionError::InsufficientPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
            ActionError::Validation(_) => "VALIDATION_ERROR",
            ActionError::RateLimited { .. } => "RATE_LIMITED",
            ActionError::InvalidRequestBody(_) => "INVALID_REQUEST_BODY",
            ActionError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            ActionError::Failed { .. } | ActionError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::AuthError => StatusCode::UNAUTHORIZED,
            ErrorKind::PermissionError => StatusCode::FORBIDDEN,
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::RateLimitError => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::RequestError => match self {
                ActionError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
                _ => StatusCode::BAD_REQUEST,
            },
            ErrorKind::UnknownError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for failures the pipeline anticipates (everything but unknown errors).
    pub fn is_known(&self) -> bool {
        self.kind() != ErrorKind::UnknownError
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::UnknownError => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ActionError::Validation(e) => Some(json!({ "issues": e.issues() })),
            ActionError::InsufficientRole { required, .. } => Some(json!({ "required": required })),
            ActionError::RoleNotAllowed { allowed, .. } => Some(json!({ "allowed": allowed })),
            ActionError::InsufficientPermissions { missing } => Some(json!({ "missing": missing })),
            ActionError::RateLimited { retry_after_secs } => {
                Some(json!({ "retryAfter": retry_after_secs }))
            }
            ActionError::InvalidRequestBody(reason) => Some(json!({ "reason": reason })),
            ActionError::MethodNotAllowed { allowed } => Some(json!({
                "allowed": allowed.iter().map(Method::as_str).collect::<Vec<_>>()
            })),
            ActionError::NotAuthenticated | ActionError::Failed { .. } | ActionError::Internal(_) => {
                None
            }
        }
    }
}

impl From<AuthzError> for ActionError {
    fn from(e: AuthzError) -> Self {
        match e {
            AuthzError::NotAuthenticated => ActionError::NotAuthenticated,
            AuthzError::InsufficientRole { required, actual } => {
                ActionError::InsufficientRole { required, actual }
            }
            AuthzError::RoleNotAllowed { actual, allowed } => {
                ActionError::RoleNotAllowed { actual, allowed }
            }
            AuthzError::InsufficientPermissions { missing } => {
                ActionError::InsufficientPermissions { missing }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
            code: self.code(),
            details: self.details(),
        };
        let mut response = (self.status(), Json(body)).into_response();

        match &self {
            ActionError::RateLimited { retry_after_secs } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            }
            ActionError::MethodNotAllowed { allowed } => {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
            }
            _ => {}
        }

        response
    }
}
