//! # Keystone
//!
//! Metadata-driven dependency injection and request pipelines on top of axum.
//!
//! Modules declare providers and controllers; controllers declare routes with
//! their parameter bindings, guards, interceptors and exception filters. At
//! startup the module graph is flattened, singletons are constructed in
//! dependency order and every route is compiled into a pipeline mounted on an
//! `axum::Router`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keystone::prelude::*;
//!
//! #[derive(Injectable)]
//! pub struct UserService;
//!
//! impl UserService {
//!     pub async fn find_one(&self, id: u32) -> Option<User> {
//!         // Business logic
//!     }
//! }
//!
//! #[controller(path = "/users", tags("Users"))]
//! pub struct UserController {
//!     user_service: Arc<UserService>,
//! }
//!
//! #[routes]
//! impl UserController {
//!     #[get(":id")]
//!     async fn get_user(&self, #[param("id")] id: u32) -> Result<Json<User>, HttpException> {
//!         self.user_service
//!             .find_one(id)
//!             .await
//!             .map(Json)
//!             .ok_or_else(|| HttpException::not_found("User not found"))
//!     }
//! }
//!
//! #[module(
//!     controllers = [UserController],
//!     providers = [UserService],
//! )]
//! pub struct AppModule;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = Application::create::<AppModule>()?;
//!     app.listen(ServerConfig::from_env()).await
//! }
//! ```

extern crate self as keystone;

pub mod config;
pub mod context;
pub mod controller;
pub mod di;
pub mod error;
pub mod exception;
pub mod guard;
pub mod interceptor;
pub mod lifecycle;
pub mod metadata;
pub mod module;
pub mod openapi;
pub mod pipeline;
pub mod transport;
pub mod validation;
pub mod websocket;

use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a handler, an interceptor chain or a whole pipeline.
pub type HandlerResult = std::result::Result<axum::response::Response, exception::Exception>;

// Re-export core types
pub use config::{ConfigService, ServerConfig};
pub use context::{HttpMethod, RequestContext};
pub use di::{Container, ContainerBuilder, Injectable, Token};
pub use error::{KeystoneError, Result};
pub use lifecycle::Application;
pub use module::Module;

// Re-export macros
pub use keystone_macro::{
    Injectable as DeriveInjectable, controller, delete, get, module, patch, post, put, routes,
};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;
pub use serde_json;

/// Prelude module for convenient imports
///
/// ```ignore
/// use keystone::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, ServerConfig};
    pub use crate::context::{HttpMethod, RequestContext};
    pub use crate::controller::{Controller, ControllerDeclaration, ParamBinding, Route};
    pub use crate::di::{Container, ContainerBuilder, Injectable, Token};
    pub use crate::error::KeystoneError;
    pub use crate::exception::{ArgumentsHost, Exception, ExceptionFilter, HttpException, HttpExceptionFilter};
    pub use crate::guard::{Guard, GuardError, GuardResult};
    pub use crate::interceptor::{Interceptor, LoggingInterceptor, Next};
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, LifecycleError, OnModuleDestroy, OnModuleInit,
    };
    pub use crate::module::{Module, ModuleDescriptor};
    pub use crate::pipeline::ApplicationOptions;
    pub use crate::websocket::{WsConnection, WsMessage};
    pub use crate::{
        DeriveInjectable as Injectable, HandlerResult, controller, delete, get, module, patch, post,
        put, routes,
    };
    pub use async_trait::async_trait;
    pub use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
