//! End-to-end tests for compiled request pipelines
//!
//! Drives the mounted router with `oneshot` and checks guard, interceptor,
//! filter and parameter binding behaviour.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use keystone::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;
use tower::ServiceExt;

#[derive(Injectable, Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Journal {
    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Injectable)]
pub struct DenyGuard {
    journal: Arc<Journal>,
}

#[async_trait]
impl Guard for DenyGuard {
    async fn can_activate(&self, _ctx: &mut RequestContext) -> GuardResult {
        self.journal.record("deny");
        Ok(false)
    }
}

#[derive(Injectable)]
pub struct AllowGuard {
    journal: Arc<Journal>,
}

#[async_trait]
impl Guard for AllowGuard {
    async fn can_activate(&self, ctx: &mut RequestContext) -> GuardResult {
        self.journal.record("allow");
        ctx.user = Some("user-1".into());
        Ok(true)
    }
}

#[derive(Injectable)]
pub struct AuditGuard {
    journal: Arc<Journal>,
}

#[async_trait]
impl Guard for AuditGuard {
    async fn can_activate(&self, _ctx: &mut RequestContext) -> GuardResult {
        self.journal.record("audit");
        Ok(true)
    }
}

#[derive(Injectable)]
pub struct OuterInterceptor {
    journal: Arc<Journal>,
}

#[async_trait]
impl Interceptor for OuterInterceptor {
    async fn intercept(&self, ctx: RequestContext, next: Next) -> HandlerResult {
        self.journal.record("outer:before");
        let response = next.run(ctx).await;
        self.journal.record("outer:after");
        response
    }
}

#[derive(Injectable)]
pub struct InnerInterceptor {
    journal: Arc<Journal>,
}

#[async_trait]
impl Interceptor for InnerInterceptor {
    async fn intercept(&self, ctx: RequestContext, next: Next) -> HandlerResult {
        self.journal.record("inner:before");
        let response = next.run(ctx).await;
        self.journal.record("inner:after");
        response
    }
}

#[derive(Injectable)]
pub struct DecliningFilter {
    journal: Arc<Journal>,
}

#[async_trait]
impl ExceptionFilter for DecliningFilter {
    async fn catch(&self, _exception: &Exception, _host: &ArgumentsHost) -> Option<Response> {
        self.journal.record("decline");
        None
    }
}

#[derive(Injectable)]
pub struct ClaimingFilter;

#[async_trait]
impl ExceptionFilter for ClaimingFilter {
    async fn catch(&self, exception: &Exception, host: &ArgumentsHost) -> Option<Response> {
        let body = json!({ "claimed": exception.to_string(), "path": host.path });
        Some((StatusCode::IM_A_TEAPOT, Json(body)).into_response())
    }
}

fn item_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name"],
        "properties": { "name": { "type": "string" } }
    })
}

#[derive(serde::Deserialize)]
pub struct NewItem {
    name: String,
}

#[controller(path = "/api", tags("Items"))]
pub struct ItemController {
    journal: Arc<Journal>,
}

#[routes]
impl ItemController {
    #[get(":id")]
    async fn find_one(&self, #[param("id")] id: String) -> Result<Json<Value>, HttpException> {
        self.journal.record(format!("handler:{id}"));
        Ok(Json(json!({ "id": id })))
    }

    #[get("guarded")]
    #[use_guards(AllowGuard)]
    async fn guarded(&self) -> Result<&'static str, HttpException> {
        self.journal.record("handler:guarded");
        Ok("guarded")
    }

    #[public]
    #[get("open")]
    async fn open(&self) -> Result<&'static str, HttpException> {
        self.journal.record("handler:open");
        Ok("open")
    }

    #[get("intercepted")]
    #[use_interceptors(InnerInterceptor)]
    async fn intercepted(&self) -> Result<&'static str, HttpException> {
        self.journal.record("handler:intercepted");
        Ok("intercepted")
    }

    #[get("failing")]
    #[use_filters(DecliningFilter, ClaimingFilter)]
    async fn failing(&self) -> Result<&'static str, HttpException> {
        Err(HttpException::conflict("boom"))
    }

    #[get("unclaimed")]
    #[use_filters(DecliningFilter)]
    async fn unclaimed(&self) -> Result<&'static str, HttpException> {
        Err(HttpException::conflict("boom"))
    }

    #[post("")]
    async fn create(
        &self,
        #[body(schema = item_schema())] item: NewItem,
    ) -> Result<(StatusCode, Json<Value>), HttpException> {
        Ok((StatusCode::CREATED, Json(json!({ "name": item.name }))))
    }

    #[post("ping")]
    async fn ping(&self) -> Result<&'static str, HttpException> {
        self.journal.record("handler:ping");
        Ok("pong")
    }

    #[post("echo")]
    async fn echo(&self, #[body] body: Value) -> Result<Json<Value>, HttpException> {
        Ok(Json(body))
    }

    #[get("session")]
    async fn session(
        &self,
        #[cookie("sid")] sid: Option<String>,
        #[cookie] cookies: HashMap<String, String>,
    ) -> Result<Json<Value>, HttpException> {
        Ok(Json(json!({ "sid": sid, "count": cookies.len() })))
    }

    #[get("search")]
    #[use_guards(AllowGuard)]
    async fn search(
        &self,
        #[query("page")] page: Option<u32>,
        #[current_user] user: Option<String>,
        #[headers("x-trace")] trace: Option<String>,
    ) -> Result<Json<Value>, HttpException> {
        Ok(Json(json!({ "page": page, "user": user, "trace": trace })))
    }
}

#[controller(path = "/admin", guards(AllowGuard))]
pub struct AdminController {
    journal: Arc<Journal>,
}

#[routes]
impl AdminController {
    #[get("stats")]
    async fn stats(&self) -> Result<&'static str, HttpException> {
        self.journal.record("handler:stats");
        Ok("stats")
    }
}

#[controller(path = "/status", public, guards(AllowGuard))]
pub struct StatusController {
    journal: Arc<Journal>,
}

#[routes]
impl StatusController {
    #[get("")]
    async fn status(&self, #[current_user] user: Option<String>) -> Result<Json<Value>, HttpException> {
        self.journal.record("handler:status");
        Ok(Json(json!({ "user": user })))
    }
}

#[module(
    controllers = [ItemController, AdminController, StatusController],
    providers = [
        Journal,
        DenyGuard,
        AllowGuard,
        AuditGuard,
        OuterInterceptor,
        InnerInterceptor,
        DecliningFilter,
        ClaimingFilter,
    ],
)]
pub struct ItemModule;

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Application, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn journal(app: &Application) -> Vec<String> {
    app.container().resolve::<Journal>().unwrap().events()
}

#[tokio::test]
async fn test_path_parameter_is_bound_as_string() {
    let app = Application::create::<ItemModule>().unwrap();

    let (status, body) = send(&app, get_request("/api/123")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": "123" }));
    assert_eq!(journal(&app), vec!["handler:123"]);
}

#[tokio::test]
async fn test_global_guard_denial_short_circuits() {
    let app = Application::builder::<ItemModule>()
        .global_guard::<DenyGuard>()
        .build()
        .unwrap();

    let (status, body) = send(&app, get_request("/api/guarded")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "message": "Forbidden" }));
    assert_eq!(journal(&app), vec!["deny"]);
}

#[tokio::test]
async fn test_public_route_skips_global_guards() {
    let app = Application::builder::<ItemModule>()
        .global_guard::<DenyGuard>()
        .build()
        .unwrap();

    let (status, body) = send(&app, get_request("/api/open")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("open"));
    assert_eq!(journal(&app), vec!["handler:open"]);
}

#[tokio::test]
async fn test_interceptors_nest_global_outside_method() {
    let app = Application::builder::<ItemModule>()
        .global_interceptor::<OuterInterceptor>()
        .build()
        .unwrap();

    let (status, _) = send(&app, get_request("/api/intercepted")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        journal(&app),
        vec![
            "outer:before",
            "inner:before",
            "handler:intercepted",
            "inner:after",
            "outer:after",
        ]
    );
}

#[tokio::test]
async fn test_first_claiming_filter_wins() {
    let app = Application::create::<ItemModule>().unwrap();

    let (status, body) = send(&app, get_request("/api/failing")).await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body, json!({ "claimed": "boom", "path": "/api/failing" }));
    assert_eq!(journal(&app), vec!["decline"]);
}

#[tokio::test]
async fn test_unclaimed_exception_keeps_its_status() {
    let app = Application::create::<ItemModule>().unwrap();

    let (status, body) = send(&app, get_request("/api/unclaimed")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["message"], "boom");
}

#[tokio::test]
async fn test_body_is_validated_before_the_handler() {
    let app = Application::create::<ItemModule>().unwrap();

    let (status, body) = send(&app, post_request("/api", r#"{"name":"lamp"}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "name": "lamp" }));

    let (status, body) = send(&app, post_request("/api", r#"{"name":5}"#)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Validation error");
    assert!(body["data"].as_array().is_some_and(|errors| !errors.is_empty()));

    let (status, _) = send(&app, post_request("/api", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_query_user_and_header_bindings() {
    let app = Application::create::<ItemModule>().unwrap();

    let request = Request::builder()
        .uri("/api/search?page=2")
        .header("X-Trace", "abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "page": 2, "user": "user-1", "trace": "abc" }));

    let (_, body) = send(&app, get_request("/api/search")).await;
    assert_eq!(body["page"], Value::Null);
    assert_eq!(body["trace"], Value::Null);
}

#[tokio::test]
async fn test_route_table_carries_tags_and_security() {
    let app = Application::builder::<ItemModule>()
        .security_scheme("bearer")
        .openapi("/docs")
        .build()
        .unwrap();

    let open = app
        .routes()
        .iter()
        .find(|route| route.handler_name == "open")
        .unwrap();
    assert!(open.public);
    assert!(open.security.is_empty());

    let find_one = app
        .routes()
        .iter()
        .find(|route| route.handler_name == "find_one")
        .unwrap();
    assert_eq!(find_one.path, "/api/:id");
    assert_eq!(find_one.api_tags, vec!["Items"]);
    assert_eq!(find_one.security, vec!["bearer"]);

    let (status, document) = send(&app, get_request("/docs/json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["paths"]["/api/{id}"]["get"]["tags"], json!(["Items"]));
    assert_eq!(
        document["paths"]["/api"]["post"]["requestBody"]["content"]["application/json"]["schema"],
        item_schema()
    );
}

fn typed_post(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_unbound_text_body_is_not_parsed() {
    let app = Application::create::<ItemModule>().unwrap();

    let (status, body) = send(&app, typed_post("/api/ping", "text/plain", "hello")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("pong"));
    assert_eq!(journal(&app), vec!["handler:ping"]);

    let request = Request::builder()
        .method("POST")
        .uri("/api/ping")
        .body(Body::from("not json at all"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_body_binding_follows_content_type() {
    let app = Application::create::<ItemModule>().unwrap();

    let form = typed_post("/api/echo", "application/x-www-form-urlencoded", "name=ada&lang=rust");
    let (status, body) = send(&app, form).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "ada", "lang": "rust" }));

    let (status, body) = send(&app, typed_post("/api/echo", "text/plain; charset=utf-8", "hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("hello"));

    let (status, body) = send(&app, post_request("/api/echo", r#"{"n":1}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "n": 1 }));
}

#[tokio::test]
async fn test_malformed_json_reaches_global_filters() {
    let app = Application::builder::<ItemModule>()
        .global_filter::<ClaimingFilter>()
        .build()
        .unwrap();

    let (status, body) = send(&app, post_request("/api/ping", "{oops")).await;

    assert_eq!(status, StatusCode::IM_A_TEAPOT);
    assert_eq!(body["path"], "/api/ping");
    assert!(journal(&app).is_empty());
}

#[tokio::test]
async fn test_cookies_bind_from_the_cookie_header() {
    let app = Application::create::<ItemModule>().unwrap();

    let request = Request::builder()
        .uri("/api/session")
        .header("cookie", "sid=abc123; theme=dark")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "sid": "abc123", "count": 2 }));

    let (_, body) = send(&app, get_request("/api/session")).await;
    assert_eq!(body, json!({ "sid": null, "count": 0 }));
}

#[tokio::test]
async fn test_controller_guards_run_after_global_guards() {
    let app = Application::builder::<ItemModule>()
        .global_guard::<AuditGuard>()
        .build()
        .unwrap();

    let (status, _) = send(&app, get_request("/admin/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(journal(&app), vec!["audit", "allow", "handler:stats"]);
}

#[tokio::test]
async fn test_public_controller_keeps_its_own_guards() {
    let app = Application::builder::<ItemModule>()
        .global_guard::<DenyGuard>()
        .build()
        .unwrap();

    let (status, body) = send(&app, get_request("/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "user": "user-1" }));
    assert_eq!(journal(&app), vec!["allow", "handler:status"]);

    let (status, _) = send(&app, get_request("/admin/stats")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
