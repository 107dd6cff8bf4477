use crate::context::RequestContext;
use crate::di::{ComponentRef, Container, Injectable};
use crate::{BoxFuture, HandlerResult};
use async_trait::async_trait;
use std::sync::Arc;

pub mod logging;

pub use logging::LoggingInterceptor;

/// Represents the next handler in the chain
pub struct Next {
    run: Box<dyn FnOnce(RequestContext) -> BoxFuture<'static, HandlerResult> + Send>,
}

impl Next {
    /// Create a new Next handler
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(RequestContext) -> BoxFuture<'static, HandlerResult> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Execute the rest of the chain
    pub async fn run(self, ctx: RequestContext) -> HandlerResult {
        (self.run)(ctx).await
    }
}

/// The Interceptor trait
///
/// Interceptors wrap the handler. The first interceptor in a route's list is
/// the outermost one: it runs first on the way in and last on the way out.
/// Not calling `next` skips the rest of the chain.
///
/// # Example
/// ```ignore
/// struct TimingInterceptor;
///
/// #[async_trait]
/// impl Interceptor for TimingInterceptor {
///     async fn intercept(&self, ctx: RequestContext, next: Next) -> HandlerResult {
///         let start = Instant::now();
///         let response = next.run(ctx).await?;
///         tracing::info!(elapsed = ?start.elapsed());
///         Ok(response)
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, ctx: RequestContext, next: Next) -> HandlerResult;
}

/// Reference to an interceptor type
pub type InterceptorRef = ComponentRef<dyn Interceptor>;

impl ComponentRef<dyn Interceptor> {
    pub fn of<I: Interceptor + Injectable>() -> Self {
        ComponentRef::new::<I>(
            |container| container.resolve::<I>().map(|i| i as Arc<dyn Interceptor>),
            || I::inject(&Container::new()).map(|i| Arc::new(i) as Arc<dyn Interceptor>),
        )
    }
}

/// Nest `interceptors` around `innermost`, first element outermost.
pub(crate) fn chain(interceptors: &[Arc<dyn Interceptor>], innermost: Next) -> Next {
    interceptors.iter().rev().fold(innermost, |next, interceptor| {
        let interceptor = Arc::clone(interceptor);
        Next::new(move |ctx| Box::pin(async move { interceptor.intercept(ctx, next).await }))
    })
}
