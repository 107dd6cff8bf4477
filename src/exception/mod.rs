//! Exception filters and the request-level error type.

use crate::context::{HttpMethod, RequestContext};
use crate::di::{ComponentRef, Container, Injectable};
use async_trait::async_trait;
use axum::response::Response;
use std::sync::Arc;

pub mod http;

pub use http::{HttpException, HttpExceptionFilter, default_error_response};

/// A type-erased error raised while handling a request
pub type Exception = Box<dyn std::error::Error + Send + Sync>;

/// Context for exception handling
#[derive(Debug, Clone)]
pub struct ArgumentsHost {
    pub method: HttpMethod,
    pub path: String,
    /// Authenticated user, if a guard attached one before the failure
    pub user: Option<String>,
}

impl ArgumentsHost {
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            method: ctx.method,
            path: ctx.path.clone(),
            user: ctx.user.clone(),
        }
    }
}

/// The ExceptionFilter trait
///
/// Filters are tried in order when guards, interceptors, argument binding or
/// the handler fail. Returning `None` declines the exception and passes it on
/// to the next filter; the first `Some` becomes the response.
///
/// # Example
/// ```ignore
/// #[derive(Injectable)]
/// struct NotFoundFilter;
///
/// #[async_trait]
/// impl ExceptionFilter for NotFoundFilter {
///     async fn catch(&self, exception: &Exception, _host: &ArgumentsHost) -> Option<Response> {
///         let http = exception.downcast_ref::<HttpException>()?;
///         (http.status() == StatusCode::NOT_FOUND).then(|| http.clone().into_response())
///     }
/// }
/// ```
#[async_trait]
pub trait ExceptionFilter: Send + Sync + 'static {
    async fn catch(&self, exception: &Exception, host: &ArgumentsHost) -> Option<Response>;
}

/// Reference to an exception filter type
pub type FilterRef = ComponentRef<dyn ExceptionFilter>;

impl ComponentRef<dyn ExceptionFilter> {
    pub fn of<F: ExceptionFilter + Injectable>() -> Self {
        ComponentRef::new::<F>(
            |container| container.resolve::<F>().map(|f| f as Arc<dyn ExceptionFilter>),
            || F::inject(&Container::new()).map(|f| Arc::new(f) as Arc<dyn ExceptionFilter>),
        )
    }
}
