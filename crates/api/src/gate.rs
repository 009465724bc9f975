use std::future::Future;
use std::sync::Arc;

use axum::http::Method;

use storegate_auth::{GuardOptions, GuardResult, PrincipalResolver, SessionHandle, guard_route};
use storegate_core::{RateLimiter, Schema};

use crate::action::SecureAction;
use crate::config::ActionConfig;
use crate::context::{ActionContext, RouteContext};
use crate::error::ActionError;
use crate::route::SecureRoute;

/// Shared collaborators of every protected operation.
///
/// Cheap to clone; wrap handlers with [`action`](Self::action) or
/// [`route`](Self::route) to get a callable with the full check sequence.
#[derive(Clone)]
pub struct SecureGate {
    resolver: Arc<PrincipalResolver>,
    limiter: RateLimiter,
}

impl core::fmt::Debug for SecureGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecureGate")
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl SecureGate {
    pub fn new(resolver: PrincipalResolver, limiter: RateLimiter) -> Self {
        Self {
            resolver: Arc::new(resolver),
            limiter,
        }
    }

    pub fn resolver(&self) -> &PrincipalResolver {
        &self.resolver
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn action<S, F, Fut, O>(
        &self,
        config: ActionConfig,
        schema: S,
        handler: F,
    ) -> SecureAction<S, F>
    where
        S: Schema,
        F: Fn(S::Output, ActionContext) -> Fut,
        Fut: Future<Output = Result<O, ActionError>>,
    {
        SecureAction::new(self.clone(), config, schema, handler)
    }

    pub fn route<S, F, Fut, O>(
        &self,
        method: Method,
        config: ActionConfig,
        schema: S,
        handler: F,
    ) -> SecureRoute<S, F>
    where
        S: Schema,
        F: Fn(S::Output, RouteContext) -> Fut,
        Fut: Future<Output = Result<O, ActionError>>,
    {
        SecureRoute::new(self.clone(), method, config, schema, handler)
    }

    pub async fn guard(&self, session: &SessionHandle, options: &GuardOptions) -> GuardResult {
        guard_route(&self.resolver, session, options).await
    }
}
