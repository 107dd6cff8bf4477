use crate::HandlerResult;
use crate::context::RequestContext;
use crate::interceptor::{Interceptor, Next};
use async_trait::async_trait;
use std::time::Instant;

/// An interceptor that logs request timing and status
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

impl crate::di::Injectable for LoggingInterceptor {
    fn inject(_: &crate::di::Container) -> crate::error::Result<Self> {
        Ok(Self)
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, ctx: RequestContext, next: Next) -> HandlerResult {
        let method = ctx.method;
        let path = ctx.path.clone();
        let start = Instant::now();

        tracing::info!("--> {} {}", method, path);

        match next.run(ctx).await {
            Ok(response) => {
                tracing::info!(
                    "<-- {} {} {} {:?}",
                    method,
                    path,
                    response.status(),
                    start.elapsed()
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!("<-- {} {} ERROR: {} {:?}", method, path, e, start.elapsed());
                Err(e)
            }
        }
    }
}
