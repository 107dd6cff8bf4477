use crate::context::RequestContext;
use crate::di::{ComponentRef, Container, Injectable};
use crate::exception::{Exception, HttpException};
use async_trait::async_trait;
use std::sync::Arc;

/// Denial reasons a guard can raise as an error.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// Ok(true) allows the request, Ok(false) denies it with 403
pub type GuardResult = Result<bool, Exception>;

/// The Guard trait
/// Implement this to protect routes
///
/// Guards run in order before interceptors and the handler. A guard may
/// attach data to the context (usually the authenticated user) for
/// everything that runs after it.
///
/// # Example
/// ```ignore
/// #[derive(Injectable)]
/// struct AuthGuard {
///     tokens: Arc<TokenService>,
/// }
///
/// #[async_trait]
/// impl Guard for AuthGuard {
///     async fn can_activate(&self, ctx: &mut RequestContext) -> GuardResult {
///         let Some(token) = ctx.bearer_token() else {
///             return Err(GuardError::Unauthorized("missing token".into()).into());
///         };
///         ctx.user = Some(self.tokens.verify(token).await?);
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait Guard: Send + Sync + 'static {
    async fn can_activate(&self, ctx: &mut RequestContext) -> GuardResult;
}

/// Reference to a guard type
pub type GuardRef = ComponentRef<dyn Guard>;

impl ComponentRef<dyn Guard> {
    pub fn of<G: Guard + Injectable>() -> Self {
        ComponentRef::new::<G>(
            |container| container.resolve::<G>().map(|g| g as Arc<dyn Guard>),
            || G::inject(&Container::new()).map(|g| Arc::new(g) as Arc<dyn Guard>),
        )
    }
}

/// Normalize an error raised by a guard into an [`HttpException`].
///
/// `GuardError::Unauthorized` maps to 401; every other error that is not
/// already an `HttpException` maps to 403.
pub(crate) fn denial(error: Exception) -> Exception {
    if error.is::<HttpException>() {
        return error;
    }
    match error.downcast::<GuardError>() {
        Ok(guard) => match *guard {
            GuardError::Unauthorized(message) => Box::new(HttpException::unauthorized(message)),
            GuardError::Forbidden(message) => Box::new(HttpException::forbidden(message)),
        },
        Err(other) => Box::new(HttpException::forbidden(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status(error: Exception) -> StatusCode {
        denial(error).downcast_ref::<HttpException>().unwrap().status()
    }

    #[test]
    fn test_guard_errors_map_to_http_statuses() {
        assert_eq!(
            status(Box::new(GuardError::Unauthorized("expired".into()))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(Box::new(GuardError::Forbidden("admins only".into()))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status("token service down".into()), StatusCode::FORBIDDEN);
        assert_eq!(
            status(Box::new(HttpException::not_found("no such user"))),
            StatusCode::NOT_FOUND
        );
    }
}
