//! Protected HTTP API routes.
//!
//! Same check sequence as [`SecureAction`](crate::SecureAction), plus method
//! restriction and request/response marshalling. `GET` input comes from the
//! query string; every other method reads a JSON body. A `GET` route also
//! answers `HEAD`, as axum's method routing does.

use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use serde::Serialize;
use serde_json::{Map, Value};

use storegate_auth::Principal;
use storegate_core::Schema;

use crate::config::ActionConfig;
use crate::context::RouteContext;
use crate::error::ActionError;
use crate::gate::SecureGate;
use crate::pipeline::Run;
use crate::request::RequestHandle;

pub struct SecureRoute<S, F> {
    gate: SecureGate,
    method: Method,
    config: ActionConfig,
    schema: S,
    handler: F,
}

impl<S, F> SecureRoute<S, F>
where
    S: Schema,
{
    pub(crate) fn new(
        gate: SecureGate,
        method: Method,
        config: ActionConfig,
        schema: S,
        handler: F,
    ) -> Self {
        Self {
            gate,
            method,
            config,
            schema,
            handler,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// `true` if requests with `method` run this route.
    pub fn accepts(&self, method: &Method) -> bool {
        *method == self.method || (self.method == Method::GET && *method == Method::HEAD)
    }

    /// Run the pipeline for one request and render the outcome.
    pub async fn respond<O, Fut>(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response
    where
        F: Fn(S::Output, RouteContext) -> Fut,
        Fut: Future<Output = Result<O, ActionError>>,
        O: Serialize,
    {
        let request = RequestHandle::from_headers(headers);
        let run = Run::start(&self.gate, &self.config, request.request_id);
        let mut principal = None;
        let result = self
            .execute(&run, &request, method, uri, &body, &mut principal)
            .await;

        match run.finish(principal.as_ref(), result) {
            Ok(out) => (StatusCode::OK, Json(out)).into_response(),
            Err(err) => err.into_response(),
        }
    }

    async fn execute<O, Fut>(
        &self,
        run: &Run<'_>,
        request: &RequestHandle,
        method: &Method,
        uri: &Uri,
        body: &[u8],
        principal: &mut Option<Principal>,
    ) -> Result<O, ActionError>
    where
        F: Fn(S::Output, RouteContext) -> Fut,
        Fut: Future<Output = Result<O, ActionError>>,
    {
        if !self.accepts(method) {
            return Err(ActionError::MethodNotAllowed {
                allowed: vec![self.method.clone()],
            });
        }
        run.check_rate_limit(&request.client_ip).await?;
        let raw = read_input(method, uri, body)?;
        let (input, owner) = run.prepare_input(&self.schema, raw)?;
        *principal = run.authorize(&request.session, owner.as_ref()).await?;

        let ctx = RouteContext {
            action: run.context(principal.as_ref()),
            method: method.clone(),
            path: uri.path().to_string(),
            client_ip: request.client_ip.clone(),
        };
        (self.handler)(input, ctx).await
    }
}

impl<S, F, Fut, O> SecureRoute<S, F>
where
    S: Schema + 'static,
    F: Fn(S::Output, RouteContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ActionError>> + Send + 'static,
    O: Serialize + Send + 'static,
{
    /// Standalone method router; other methods get a `405` envelope.
    pub fn into_method_router(self) -> MethodRouter {
        let allowed = vec![self.method.clone()];
        reject_other_methods(self.mount(MethodRouter::new()), allowed)
    }

    /// Add this route to `router`, sharing its path with other routes.
    ///
    /// Finish the chain with [`reject_other_methods`] to keep the `405`
    /// envelope for unmatched methods.
    pub fn mount(self, router: MethodRouter) -> MethodRouter {
        let filter = MethodFilter::try_from(self.method.clone());
        let route = Arc::new(self);
        let handler = move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let route = Arc::clone(&route);
            async move { route.respond(&method, &uri, &headers, body).await }
        };
        match filter {
            Ok(filter) => router.on(filter, handler),
            // No filter for this method: the pipeline's own method check applies.
            Err(_) => router.fallback(handler),
        }
    }
}

/// Answer unmatched methods with the `405 METHOD_NOT_ALLOWED` envelope.
pub fn reject_other_methods(router: MethodRouter, allowed: Vec<Method>) -> MethodRouter {
    router.fallback(move || {
        let allowed = allowed.clone();
        async move { ActionError::MethodNotAllowed { allowed }.into_response() }
    })
}

/// Pipeline input for one request.
///
/// `GET`/`HEAD`: the query string as an object of strings, last value winning
/// for repeated keys. Otherwise the JSON body, with an empty body read as `{}`.
pub(crate) fn read_input(method: &Method, uri: &Uri, body: &[u8]) -> Result<Value, ActionError> {
    if *method == Method::GET || *method == Method::HEAD {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map_err(|e| ActionError::InvalidRequestBody(e.body_text()))?;
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Ok(Value::Object(map));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| ActionError::InvalidRequestBody(e.to_string()))
}
