use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use serde_json::Value;
use std::collections::HashMap;
use strum_macros::{AsRefStr, Display, EnumString};

/// HTTP methods a route can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Request-scoped state shared by guards, interceptors, parameter binding and
/// the handler of one request.
///
/// Guards receive it mutably and may attach derived data (the authenticated
/// user, extra response headers) for everything that runs after them.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: HttpMethod,
    pub path: String,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    /// Parsed JSON body, `Null` when the request had none
    pub body: Value,
    /// Authenticated user id, set by a guard
    pub user: Option<String>,
    /// Headers appended to the response.
    ///
    /// Headers set by guards reach every response, including denials and
    /// filter output. Headers set by interceptors reach the handler's response
    /// when the interceptor passes the context on through `next`.
    pub response_headers: HeaderMap,
}

impl RequestContext {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            cookies: HashMap::new(),
            body: Value::Null,
            user: None,
            response_headers: HeaderMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Token from an `Authorization: Bearer <token>` header
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Header map as JSON; repeated headers are joined with ", "
    pub fn headers_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for name in self.headers.keys() {
            let joined = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            map.insert(name.as_str().to_string(), Value::String(joined));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_method_round_trips_through_strings() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::from_str("patch").unwrap(), HttpMethod::Patch);
    }

    #[test]
    fn test_bearer_token() {
        let ctx = RequestContext::new(HttpMethod::Get, "/me").with_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def"),
        );
        assert_eq!(ctx.bearer_token(), Some("abc.def"));

        let ctx = RequestContext::new(HttpMethod::Get, "/me")
            .with_header(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(ctx.bearer_token(), None);
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let name = HeaderName::from_static("x-tag");
        let ctx = RequestContext::new(HttpMethod::Get, "/")
            .with_header(name.clone(), HeaderValue::from_static("a"))
            .with_header(name, HeaderValue::from_static("b"));
        assert_eq!(ctx.headers_json()["x-tag"], "a, b");
    }
}
