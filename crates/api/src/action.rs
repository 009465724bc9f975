//! Protected server actions.

use std::future::Future;

use serde_json::Value;

use storegate_auth::Principal;
use storegate_core::Schema;

use crate::config::ActionConfig;
use crate::context::ActionContext;
use crate::error::ActionError;
use crate::gate::SecureGate;
use crate::pipeline::Run;
use crate::request::RequestHandle;

/// A handler wrapped in the full check sequence.
///
/// Built with [`SecureGate::action`]. Calling it is the only way to reach the
/// handler.
pub struct SecureAction<S, F> {
    gate: SecureGate,
    config: ActionConfig,
    schema: S,
    handler: F,
}

impl<S, F> SecureAction<S, F>
where
    S: Schema,
{
    pub(crate) fn new(gate: SecureGate, config: ActionConfig, schema: S, handler: F) -> Self {
        Self {
            gate,
            config,
            schema,
            handler,
        }
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    pub async fn call<O, Fut>(&self, request: &RequestHandle, input: Value) -> Result<O, ActionError>
    where
        F: Fn(S::Output, ActionContext) -> Fut,
        Fut: Future<Output = Result<O, ActionError>>,
    {
        let run = Run::start(&self.gate, &self.config, request.request_id);
        let mut principal = None;
        let result = self.execute(&run, request, input, &mut principal).await;
        run.finish(principal.as_ref(), result)
    }

    async fn execute<O, Fut>(
        &self,
        run: &Run<'_>,
        request: &RequestHandle,
        input: Value,
        principal: &mut Option<Principal>,
    ) -> Result<O, ActionError>
    where
        F: Fn(S::Output, ActionContext) -> Fut,
        Fut: Future<Output = Result<O, ActionError>>,
    {
        run.check_rate_limit(&request.client_ip).await?;
        let (input, owner) = run.prepare_input(&self.schema, input)?;
        *principal = run.authorize(&request.session, owner.as_ref()).await?;
        let ctx = run.context(principal.as_ref());
        (self.handler)(input, ctx).await
    }
}
