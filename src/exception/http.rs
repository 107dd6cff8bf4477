use crate::exception::{ArgumentsHost, Exception, ExceptionFilter};
use async_trait::async_trait;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// An error that maps directly onto an HTTP status.
///
/// Raise it from handlers, guards or interceptors; the filters and the
/// default error behaviour turn it into a JSON error body.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpException {
    status: StatusCode,
    message: String,
    response: Option<Value>,
}

impl HttpException {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            response: None,
        }
    }

    /// Attach structured details, rendered under `data`
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable_entity(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }
}

impl IntoResponse for HttpException {
    fn into_response(self) -> Response {
        let mut body = json!({
            "statusCode": self.status.as_u16(),
            "message": self.message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let Some(data) = self.response {
            body["data"] = data;
        }
        (self.status, Json(body)).into_response()
    }
}

/// Response used when no filter claims an exception.
///
/// An [`HttpException`] keeps its status; anything else becomes a 500 without
/// leaking the error message.
pub fn default_error_response(exception: Exception) -> Response {
    match exception.downcast::<HttpException>() {
        Ok(http) => (*http).into_response(),
        Err(other) => {
            tracing::error!(error = %other, "Unhandled exception");
            HttpException::internal_server_error("Internal Server Error").into_response()
        }
    }
}

/// A catch-all exception filter that renders every error as JSON
#[derive(Default)]
pub struct HttpExceptionFilter;

impl crate::di::Injectable for HttpExceptionFilter {
    fn inject(_: &crate::di::Container) -> crate::error::Result<Self> {
        Ok(Self)
    }
}

#[async_trait]
impl ExceptionFilter for HttpExceptionFilter {
    async fn catch(&self, exception: &Exception, host: &ArgumentsHost) -> Option<Response> {
        let (status, message) = if let Some(http) = exception.downcast_ref::<HttpException>() {
            (http.status(), http.message().to_string())
        } else if let Some(err) = exception.downcast_ref::<crate::error::KeystoneError>() {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, exception.to_string())
        };

        tracing::warn!(
            method = %host.method,
            path = %host.path,
            status = status.as_u16(),
            "Exception intercepted: {}",
            message
        );

        let mut rendered = HttpException::new(status, message);
        if let Some(data) = exception
            .downcast_ref::<HttpException>()
            .and_then(HttpException::response)
        {
            rendered = rendered.with_response(data.clone());
        }
        Some(rendered.into_response())
    }
}
