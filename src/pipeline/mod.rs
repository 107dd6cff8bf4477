//! Per-route request pipelines.
//!
//! A pipeline runs guards, then the interceptor chain around argument binding
//! and the handler, and hands any failure to the exception filters.

mod compiler;
mod options;
mod path;

pub use compiler::{CompiledApplication, PipelineCompiler};
pub use options::ApplicationOptions;
pub use path::{normalize_path, route_shape};

use crate::context::{HttpMethod, RequestContext};
use crate::controller::{ErasedHandler, ParamBinding, extract_arguments};
use crate::di::Instance;
use crate::exception::{ArgumentsHost, Exception, ExceptionFilter};
use crate::guard::{self, Guard};
use crate::interceptor::{self, Interceptor, Next};
use crate::validation::ValidationSchema;
use crate::websocket::WebSocketHandlers;
use crate::HandlerResult;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

/// The controller method at the center of a pipeline.
#[derive(Clone)]
struct Endpoint {
    controller: Instance,
    handler: ErasedHandler,
    params: Arc<[ParamBinding]>,
}

impl Endpoint {
    async fn call(self, mut ctx: RequestContext) -> HandlerResult {
        let arguments = extract_arguments(&ctx, &self.params);
        let headers = std::mem::take(&mut ctx.response_headers);
        let response = (self.handler)(self.controller, arguments).await?;
        Ok(with_headers(response, &headers))
    }
}

/// A compiled request pipeline.
pub struct Pipeline {
    guards: Vec<Arc<dyn Guard>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    filters: Vec<Arc<dyn ExceptionFilter>>,
    endpoint: Endpoint,
}

impl Pipeline {
    pub(crate) fn new(
        guards: Vec<Arc<dyn Guard>>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        filters: Vec<Arc<dyn ExceptionFilter>>,
        controller: Instance,
        handler: ErasedHandler,
        params: Vec<ParamBinding>,
    ) -> Self {
        Self {
            guards,
            interceptors,
            filters,
            endpoint: Endpoint {
                controller,
                handler,
                params: params.into(),
            },
        }
    }

    /// Run the whole pipeline for one request.
    ///
    /// `Err` is returned only when every filter declined the exception.
    pub async fn handle(&self, mut ctx: RequestContext) -> HandlerResult {
        let allowed = self.check_guards(&mut ctx).await;
        let host = ArgumentsHost::new(&ctx);
        let headers = ctx.response_headers.clone();

        let outcome = match allowed {
            Ok(true) => self.invoke(ctx).await,
            Ok(false) => Ok(forbidden()),
            Err(exception) => Err(exception),
        };
        let response = match outcome {
            Ok(response) => response,
            Err(exception) => self.recover(exception, &host).await?,
        };
        Ok(with_headers(response, &headers))
    }

    /// Evaluate guards in order. The first denial or error stops the chain.
    pub async fn check_guards(&self, ctx: &mut RequestContext) -> Result<bool, Exception> {
        for guard in &self.guards {
            match guard.can_activate(ctx).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(method = %ctx.method, path = %ctx.path, "Request denied by guard");
                    return Ok(false);
                }
                Err(error) => return Err(guard::denial(error)),
            }
        }
        Ok(true)
    }

    /// Run the interceptor chain around argument binding and the handler.
    pub async fn invoke(&self, ctx: RequestContext) -> HandlerResult {
        let endpoint = self.endpoint.clone();
        let innermost = Next::new(move |ctx| Box::pin(endpoint.call(ctx)));
        interceptor::chain(&self.interceptors, innermost).run(ctx).await
    }

    /// Offer `exception` to the filters in order; the first response wins.
    pub async fn recover(&self, exception: Exception, host: &ArgumentsHost) -> HandlerResult {
        for filter in &self.filters {
            if let Some(response) = filter.catch(&exception, host).await {
                return Ok(response);
            }
        }
        Err(exception)
    }

    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "message": "Forbidden" })),
    )
        .into_response()
}

/// Append `headers` to `response`, skipping pairs it already carries.
fn with_headers(mut response: Response, headers: &HeaderMap) -> Response {
    for (name, value) in headers.iter() {
        let present = response
            .headers()
            .get_all(name)
            .iter()
            .any(|existing| existing == value);
        if !present {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }
    response
}

/// A route ready to be mounted on a transport.
pub struct CompiledRoute {
    pub method: HttpMethod,
    pub path: String,
    pub controller: &'static str,
    pub handler_name: &'static str,
    pub api_tags: Vec<String>,
    pub public: bool,
    /// Security schemes required by the route (empty when public)
    pub security: Vec<String>,
    /// Whether a handler argument reads the request body
    pub binds_body: bool,
    pub body_schema: Option<ValidationSchema>,
    pub query_schema: Option<ValidationSchema>,
    pub pipeline: Pipeline,
}

/// A websocket gateway ready to be mounted on a transport.
pub struct CompiledGateway {
    pub path: String,
    pub controller: &'static str,
    pub instance: Instance,
    pub handlers: WebSocketHandlers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use crate::controller::Arguments;
    use crate::exception::HttpException;
    use crate::guard::GuardError;
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct NamedGuard {
        log: Log,
        name: &'static str,
        allow: bool,
    }

    #[async_trait]
    impl Guard for NamedGuard {
        async fn can_activate(&self, ctx: &mut RequestContext) -> Result<bool, Exception> {
            self.log.lock().unwrap().push(self.name);
            ctx.response_headers
                .insert("x-guard", HeaderValue::from_static("seen"));
            Ok(self.allow)
        }
    }

    struct Stamp;

    #[async_trait]
    impl Interceptor for Stamp {
        async fn intercept(&self, mut ctx: RequestContext, next: Next) -> HandlerResult {
            ctx.response_headers
                .append("x-stamp", HeaderValue::from_static("interceptor"));
            next.run(ctx).await
        }
    }

    struct ExpiredToken;

    #[async_trait]
    impl Guard for ExpiredToken {
        async fn can_activate(&self, _ctx: &mut RequestContext) -> Result<bool, Exception> {
            Err(GuardError::Unauthorized("token expired".into()).into())
        }
    }

    struct Decline(Log);

    #[async_trait]
    impl ExceptionFilter for Decline {
        async fn catch(&self, _exception: &Exception, _host: &ArgumentsHost) -> Option<Response> {
            self.0.lock().unwrap().push("decline");
            None
        }
    }

    struct Claim;

    #[async_trait]
    impl ExceptionFilter for Claim {
        async fn catch(&self, _exception: &Exception, _host: &ArgumentsHost) -> Option<Response> {
            Some(StatusCode::IM_A_TEAPOT.into_response())
        }
    }

    fn handler(log: &Log, fail: bool) -> ErasedHandler {
        let log = Arc::clone(log);
        Arc::new(
            move |_: Instance, _: Arguments| -> BoxFuture<'static, HandlerResult> {
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.lock().unwrap().push("handler");
                    if fail {
                        Err(Box::new(HttpException::conflict("boom")) as Exception)
                    } else {
                        Ok(StatusCode::OK.into_response())
                    }
                })
            },
        )
    }

    fn pipeline(
        guards: Vec<Arc<dyn Guard>>,
        filters: Vec<Arc<dyn ExceptionFilter>>,
        handler: ErasedHandler,
    ) -> Pipeline {
        Pipeline::new(guards, Vec::new(), filters, Arc::new(()), handler, Vec::new())
    }

    fn ctx() -> RequestContext {
        RequestContext::new(HttpMethod::Get, "/items")
    }

    #[tokio::test]
    async fn test_denying_guard_short_circuits() {
        let log = Log::default();
        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(NamedGuard { log: log.clone(), name: "first", allow: false }),
            Arc::new(NamedGuard { log: log.clone(), name: "second", allow: true }),
        ];
        let response = pipeline(guards, Vec::new(), handler(&log, false))
            .handle(ctx())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()["x-guard"], "seen");
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_guard_error_becomes_http_exception() {
        let log = Log::default();
        let guards: Vec<Arc<dyn Guard>> = vec![Arc::new(ExpiredToken)];
        let err = pipeline(guards, Vec::new(), handler(&log, false))
            .handle(ctx())
            .await
            .err()
            .unwrap();

        let http = err.downcast_ref::<HttpException>().unwrap();
        assert_eq!(http.status(), StatusCode::UNAUTHORIZED);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_response_from_filters_wins() {
        let log = Log::default();
        let filters: Vec<Arc<dyn ExceptionFilter>> = vec![Arc::new(Decline(log.clone())), Arc::new(Claim)];
        let response = pipeline(Vec::new(), filters, handler(&log, true))
            .handle(ctx())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(*log.lock().unwrap(), vec!["handler", "decline"]);
    }

    #[tokio::test]
    async fn test_declined_exception_propagates_unmodified() {
        let log = Log::default();
        let filters: Vec<Arc<dyn ExceptionFilter>> = vec![Arc::new(Decline(log.clone()))];
        let err = pipeline(Vec::new(), filters, handler(&log, true))
            .handle(ctx())
            .await
            .err()
            .unwrap();

        let http = err.downcast_ref::<HttpException>().unwrap();
        assert_eq!(http.status(), StatusCode::CONFLICT);
        assert_eq!(http.message(), "boom");
    }

    #[tokio::test]
    async fn test_interceptor_headers_reach_the_response_once() {
        let log = Log::default();
        let guards: Vec<Arc<dyn Guard>> = vec![Arc::new(NamedGuard { log: log.clone(), name: "allow", allow: true })];
        let interceptors: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Stamp)];
        let pipeline = Pipeline::new(guards, interceptors, Vec::new(), Arc::new(()), handler(&log, false), Vec::new());

        let response = pipeline.handle(ctx()).await.unwrap();

        assert_eq!(response.headers()["x-stamp"], "interceptor");
        assert_eq!(response.headers().get_all("x-guard").iter().count(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["allow", "handler"]);
    }
}
