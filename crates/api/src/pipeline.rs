//! Check sequence shared by [`SecureAction`](crate::SecureAction) and
//! [`SecureRoute`](crate::SecureRoute).
//!
//! Order: rate limit → sanitize → validate → authenticate/authorize →
//! handler → log. Validation runs before any session lookup.

use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use storegate_auth::{Principal, PrincipalId, SessionHandle, authorize};
use storegate_core::{Schema, sanitize_value};

use crate::config::ActionConfig;
use crate::context::ActionContext;
use crate::error::ActionError;
use crate::gate::SecureGate;

/// One execution of a protected operation.
pub(crate) struct Run<'a> {
    gate: &'a SecureGate,
    config: &'a ActionConfig,
    request_id: Uuid,
    started: Instant,
}

impl<'a> Run<'a> {
    pub(crate) fn start(gate: &'a SecureGate, config: &'a ActionConfig, request_id: Uuid) -> Self {
        tracing::info!(action = %config.name, %request_id, "action started");
        Self {
            gate,
            config,
            request_id,
            started: Instant::now(),
        }
    }

    pub(crate) async fn check_rate_limit(&self, client_ip: &str) -> Result<(), ActionError> {
        let Some(policy) = &self.config.rate_limit else {
            return Ok(());
        };
        let now = Utc::now();
        let key = policy.key_for(client_ip);
        let decision = self
            .gate
            .limiter()
            .check_at(&key, policy.max, policy.window, now)
            .await;
        if decision.allowed {
            Ok(())
        } else {
            Err(ActionError::RateLimited {
                retry_after_secs: decision.retry_after_secs(now),
            })
        }
    }

    /// Sanitize and validate `raw`, returning the parsed input and the owner id
    /// named by `owner_key`, if any.
    pub(crate) fn prepare_input<S: Schema>(
        &self,
        schema: &S,
        raw: Value,
    ) -> Result<(S::Output, Option<PrincipalId>), ActionError> {
        let clean = sanitize_value(raw);
        let owner = self
            .config
            .owner_key
            .as_deref()
            .and_then(|key| owner_id(&clean, key));
        let input = schema.parse(clean)?;
        Ok((input, owner))
    }

    pub(crate) async fn authorize(
        &self,
        session: &SessionHandle,
        owner: Option<&PrincipalId>,
    ) -> Result<Option<Principal>, ActionError> {
        let requirements = self.config.requirements();
        if !requirements.needs_principal() {
            return Ok(None);
        }
        let principal = self.gate.resolver().resolve_or_deny(session).await;
        authorize(principal.as_ref(), &requirements, owner)?;
        Ok(principal)
    }

    pub(crate) fn context(&self, principal: Option<&Principal>) -> ActionContext {
        ActionContext::new(&self.config.name, self.request_id, principal)
    }

    /// Log the outcome and hide unknown failures from the caller.
    pub(crate) fn finish<O>(
        &self,
        principal: Option<&Principal>,
        result: Result<O, ActionError>,
    ) -> Result<O, ActionError> {
        let duration_ms = self.started.elapsed().as_millis() as u64;
        let action = self.config.name.as_str();
        let user_id = principal.map(|p| p.id.as_str());
        let role = principal.map(|p| p.role.as_str());
        let request_id = self.request_id;

        match result {
            Ok(out) => {
                tracing::info!(action, ?user_id, ?role, duration_ms, %request_id, "action completed");
                Ok(out)
            }
            Err(err) if err.is_known() => {
                tracing::warn!(
                    action,
                    ?user_id,
                    ?role,
                    duration_ms,
                    %request_id,
                    code = err.code(),
                    error = %err,
                    "action rejected"
                );
                Err(err)
            }
            Err(err) => {
                tracing::error!(
                    action,
                    ?user_id,
                    ?role,
                    duration_ms,
                    %request_id,
                    code = err.code(),
                    error = ?err,
                    "action failed"
                );
                Err(ActionError::Failed {
                    action: action.to_string(),
                })
            }
        }
    }
}

fn owner_id(input: &Value, key: &str) -> Option<PrincipalId> {
    match input.get(key)? {
        Value::String(s) if !s.is_empty() => Some(PrincipalId::new(s.clone())),
        Value::Number(n) => Some(PrincipalId::new(n.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn owner_id_reads_strings_and_numbers() {
        assert_eq!(owner_id(&json!({"userId": "u1"}), "userId"), Some("u1".into()));
        assert_eq!(owner_id(&json!({"userId": 7}), "userId"), Some("7".into()));
        assert_eq!(owner_id(&json!({"userId": ""}), "userId"), None);
        assert_eq!(owner_id(&json!({"other": "u1"}), "userId"), None);
        assert_eq!(owner_id(&json!(["u1"]), "userId"), None);
    }
}
