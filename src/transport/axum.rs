use super::Transport;
use super::socket::serve_socket;
use crate::context::{HttpMethod, RequestContext};
use crate::exception::{ArgumentsHost, HttpException, default_error_response};
use crate::pipeline::{CompiledGateway, CompiledRoute};
use crate::HandlerResult;
use axum::body::Bytes;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, RawPathParams};
use axum::http::{HeaderMap, Uri, header};
use axum::response::Response;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use axum_extra::extract::CookieJar;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use url::form_urlencoded;

/// [`Transport`] over an `axum::Router`.
///
/// Handlers for the same path are merged into one method router, so a GET and
/// a POST on `/users` can come from different controllers.
#[derive(Default)]
pub struct AxumTransport {
    routes: BTreeMap<String, MethodRouter>,
}

impl AxumTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, path: String, filter: MethodFilter, router: impl FnOnce(MethodRouter, MethodFilter) -> MethodRouter) {
        let existing = self.routes.remove(&path).unwrap_or_default();
        self.routes.insert(path, router(existing, filter));
    }

    pub fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router))
    }
}

impl Transport for AxumTransport {
    fn route(&mut self, route: Arc<CompiledRoute>) {
        let path = axum_path(&route.path);
        let filter = method_filter(route.method);
        self.add(path, filter, move |existing, filter| {
            existing.on(
                filter,
                move |uri: Uri,
                      params: Result<RawPathParams, RawPathParamsRejection>,
                      Query(query): Query<HashMap<String, String>>,
                      headers: HeaderMap,
                      jar: CookieJar,
                      body: Bytes| {
                    let route = Arc::clone(&route);
                    async move {
                        let params = params
                            .map(|params| {
                                params
                                    .iter()
                                    .map(|(key, value)| (key.to_string(), value.to_string()))
                                    .collect()
                            })
                            .unwrap_or_default();
                        let cookies = jar
                            .iter()
                            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
                            .collect();
                        dispatch(route, uri, params, query, headers, cookies, body).await
                    }
                },
            )
        });
    }

    fn websocket(&mut self, gateway: Arc<CompiledGateway>) {
        let path = axum_path(&gateway.path);
        self.add(path, MethodFilter::GET, move |existing, filter| {
            existing.on(filter, move |upgrade: WebSocketUpgrade| {
                let gateway = Arc::clone(&gateway);
                async move { upgrade.on_upgrade(move |socket| serve_socket(socket, gateway)) }
            })
        });
    }
}

async fn dispatch(
    route: Arc<CompiledRoute>,
    uri: Uri,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    cookies: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let parsed = parse_body(&headers, &body, route.binds_body);

    let mut ctx = RequestContext {
        method: route.method,
        path: uri.path().to_string(),
        params,
        query,
        headers,
        cookies,
        body: Value::Null,
        user: None,
        response_headers: HeaderMap::new(),
    };

    let checked = parsed.and_then(|body| {
        ctx.body = body;
        validate(&route, &ctx)
    });
    if let Err(rejected) = checked {
        let host = ArgumentsHost::new(&ctx);
        return finish(route.pipeline.recover(Box::new(rejected), &host).await);
    }

    finish(route.pipeline.handle(ctx).await)
}

fn finish(result: HandlerResult) -> Response {
    result.unwrap_or_else(default_error_response)
}

/// Decode a request body according to its `Content-Type`.
///
/// JSON becomes a value, `text/*` a string and urlencoded forms an object of
/// strings. Other or missing content types are read as JSON only when the
/// route binds the body; otherwise the body is ignored.
fn parse_body(headers: &HeaderMap, bytes: &Bytes, binds_body: bool) -> Result<Value, HttpException> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        parse_json(bytes)
    } else if mime.starts_with("text/") {
        Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
    } else if mime == "application/x-www-form-urlencoded" {
        Ok(Value::Object(
            form_urlencoded::parse(bytes)
                .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
                .collect(),
        ))
    } else if binds_body {
        parse_json(bytes)
    } else {
        Ok(Value::Null)
    }
}

fn parse_json(bytes: &Bytes) -> Result<Value, HttpException> {
    serde_json::from_slice(bytes)
        .map_err(|e| HttpException::bad_request(format!("Malformed JSON body: {e}")))
}

fn validate(route: &CompiledRoute, ctx: &RequestContext) -> Result<(), HttpException> {
    if let Some(schema) = &route.body_schema {
        schema.check(&ctx.body)?;
    }
    if let Some(schema) = &route.query_schema {
        let query = ctx
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>();
        schema.check(&Value::Object(query))?;
    }
    Ok(())
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// Convert `:name` and `*name` segments into axum's `{name}` / `{*name}`.
pub fn axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                let name = if name.is_empty() { "wildcard" } else { name };
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axum_path_conversion() {
        assert_eq!(axum_path("/api/:id"), "/api/{id}");
        assert_eq!(axum_path("/files/*rest"), "/files/{*rest}");
        assert_eq!(axum_path("/files/*"), "/files/{*wildcard}");
        assert_eq!(axum_path("/"), "/");
        assert_eq!(axum_path("/users/{id}"), "/users/{id}");
    }

    fn typed(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
        headers
    }

    #[test]
    fn test_empty_body_is_null() {
        let json = typed("application/json");
        assert_eq!(parse_body(&json, &Bytes::new(), true).unwrap(), Value::Null);
        assert_eq!(parse_body(&json, &Bytes::from_static(b"  \n"), true).unwrap(), Value::Null);
        assert!(parse_body(&json, &Bytes::from_static(b"{oops"), false).is_err());
    }

    #[test]
    fn test_body_follows_content_type() {
        let body = Bytes::from_static(b"name=ada&tags=a%20b");
        assert_eq!(
            parse_body(&typed("application/x-www-form-urlencoded"), &body, true).unwrap(),
            serde_json::json!({ "name": "ada", "tags": "a b" })
        );
        assert_eq!(
            parse_body(&typed("text/plain; charset=utf-8"), &Bytes::from_static(b"hello"), true).unwrap(),
            Value::String("hello".into())
        );
        assert_eq!(
            parse_body(&typed("application/vnd.api+json"), &Bytes::from_static(b"[1]"), false).unwrap(),
            serde_json::json!([1])
        );
    }

    #[test]
    fn test_untyped_body_is_read_only_when_bound() {
        let raw = Bytes::from_static(b"\x00\x01");
        assert_eq!(parse_body(&HeaderMap::new(), &raw, false).unwrap(), Value::Null);
        assert!(parse_body(&typed("application/octet-stream"), &raw, true).is_err());
        assert_eq!(
            parse_body(&HeaderMap::new(), &Bytes::from_static(br#"{"a":1}"#), true).unwrap(),
            serde_json::json!({ "a": 1 })
        );
    }
}
