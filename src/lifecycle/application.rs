//! Application Bootstrap
//!
//! Composes a root module into a running application: metadata, container,
//! compiled pipelines, axum router and the init/destroy state machine.

use super::{LifecycleManager, Result, shutdown_signal};
use crate::config::ServerConfig;
use crate::di::{Container, ContainerBuilder, Injectable, Provider};
use crate::exception::ExceptionFilter;
use crate::guard::Guard;
use crate::interceptor::Interceptor;
use crate::metadata::MetadataRegistry;
use crate::module::{Module, ModuleGraph, ModuleRef};
use crate::pipeline::{ApplicationOptions, CompiledApplication, CompiledRoute, PipelineCompiler, normalize_path};
use crate::transport::{AxumTransport, mount};
use crate::openapi;
use axum::Json;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unstarted,
    Initialized,
    Destroyed,
}

/// A composed application
///
/// Built once from a root module. Construction of controllers and compilation
/// of every route happen in [`ApplicationBuilder::build`], before any request
/// can reach the router.
///
/// # Example
///
/// ```rust,ignore
/// use keystone::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let app = Application::builder::<AppModule>()
///         .global_guard::<AuthGuard>()
///         .global_filter::<HttpExceptionFilter>()
///         .build()?;
///
///     app.listen(ServerConfig::from_env()).await
/// }
/// ```
pub struct Application {
    registry: MetadataRegistry,
    container: Arc<Container>,
    compiled: CompiledApplication,
    router: Router,
    state: Mutex<LifecycleState>,
}

impl Application {
    pub fn builder<M: Module>() -> ApplicationBuilder {
        ApplicationBuilder::new(ModuleRef::of::<M>())
    }

    /// Compose `M` with default options.
    pub fn create<M: Module>() -> crate::Result<Self> {
        Self::builder::<M>().build()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    pub fn routes(&self) -> &[Arc<CompiledRoute>] {
        &self.compiled.routes
    }

    /// The mounted router; cheap to clone and safe to serve before `init`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.lock().await
    }

    /// Construct every provider, then run `OnModuleInit` hooks in
    /// construction order.
    ///
    /// A second call is a no-op. A failed hook aborts startup; the
    /// application stays marked initialized and is not retried.
    pub async fn init(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if *state != LifecycleState::Unstarted {
            tracing::debug!("Application already initialized, skipping init");
            return Ok(());
        }
        *state = LifecycleState::Initialized;

        tracing::info!("Starting application initialization...");
        self.container.resolve_all()?;
        self.log_routes();

        LifecycleManager::from_container(&self.container)
            .call_module_init()
            .await?;

        tracing::info!("Application initialization complete");
        Ok(())
    }

    /// Run `OnModuleDestroy` hooks in reverse construction order.
    ///
    /// Hook failures are logged and do not stop the remaining hooks. Only the
    /// first call does anything.
    pub async fn destroy(&self) -> usize {
        let mut state = self.state.lock().await;
        if *state == LifecycleState::Destroyed {
            return 0;
        }
        *state = LifecycleState::Destroyed;

        tracing::info!("Shutting down application...");
        let failures = LifecycleManager::from_container(&self.container)
            .call_module_destroy()
            .await;
        tracing::info!("Application shutdown complete");
        failures
    }

    /// Initialize, serve until a shutdown signal arrives, then destroy.
    pub async fn listen(self, config: ServerConfig) -> anyhow::Result<()> {
        self.init().await?;

        let listener = tokio::net::TcpListener::bind(config.addr()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        let router = self.router().layer(TraceLayer::new_for_http());
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.destroy().await;
        Ok(())
    }

    fn log_routes(&self) {
        for (controller, prefix) in &self.compiled.controllers {
            tracing::info!("{} {{{}}}", controller, prefix);
        }
        for route in &self.compiled.routes {
            tracing::info!("Mapped {{{}, {}}} route", route.path, route.method);
        }
        for gateway in &self.compiled.gateways {
            tracing::info!("Mapped {{{}, WS}} gateway", gateway.path);
        }
    }
}

/// Builder for Application
pub struct ApplicationBuilder {
    root: ModuleRef,
    options: ApplicationOptions,
    values: Vec<Provider>,
}

impl ApplicationBuilder {
    pub fn new(root: ModuleRef) -> Self {
        Self {
            root,
            options: ApplicationOptions::default(),
            values: Vec::new(),
        }
    }

    pub fn options(mut self, options: ApplicationOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply `G` to every route that is not public
    pub fn global_guard<G: Guard + Injectable>(mut self) -> Self {
        self.options = self.options.guard::<G>();
        self
    }

    pub fn global_interceptor<I: Interceptor + Injectable>(mut self) -> Self {
        self.options = self.options.interceptor::<I>();
        self
    }

    pub fn global_filter<F: ExceptionFilter + Injectable>(mut self) -> Self {
        self.options = self.options.filter::<F>();
        self
    }

    /// Register a ready-made value. It takes precedence over a module
    /// provider of the same type.
    pub fn provide<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.push(Provider::value(value));
        self
    }

    pub fn security_scheme(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.security_scheme(name);
        self
    }

    pub fn openapi(mut self, path: impl Into<String>) -> Self {
        self.options = self.options.openapi(path);
        self
    }

    /// Resolve the module graph, construct controllers and compile every route.
    ///
    /// # Errors
    /// Any unregistered dependency, cycle or invalid schema aborts the build.
    pub fn build(self) -> crate::Result<Application> {
        let mut registry = MetadataRegistry::new();
        let resolved = ModuleGraph::resolve(self.root, &mut registry);

        let mut builder = ContainerBuilder::new();
        for provider in self.values.into_iter().chain(resolved.providers.iter().cloned()) {
            builder = builder.provider(provider);
        }
        for (_, controller) in &resolved.controllers {
            builder = builder.controller(controller.provider().clone());
        }
        let container = Arc::new(builder.build()?);

        let compiled = PipelineCompiler::new(&container, &registry, &self.options)
            .compile(resolved.controller_tokens())?;

        let mut transport = AxumTransport::new();
        mount(&mut transport, &compiled);
        let mut router = transport.into_router();

        if let Some(path) = &self.options.openapi_path {
            let document = Arc::new(openapi::document(&compiled.routes, &self.options));
            let path = normalize_path(&[path.as_str(), "json"]);
            tracing::debug!("Serving OpenAPI document at {}", path);
            router = router.route(
                &path,
                get(move || {
                    let document = Arc::clone(&document);
                    async move { Json(document.as_ref().clone()) }
                }),
            );
        }

        tracing::debug!(
            modules = resolved.modules.len(),
            routes = compiled.routes.len(),
            gateways = compiled.gateways.len(),
            "Application composed"
        );

        Ok(Application {
            registry,
            container,
            compiled,
            router,
            state: Mutex::new(LifecycleState::Unstarted),
        })
    }
}
