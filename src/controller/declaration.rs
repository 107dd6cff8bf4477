use super::{Arguments, Controller, ErasedHandler, ParamBinding, RouteMetadata};
use crate::HandlerResult;
use crate::context::HttpMethod;
use crate::di::{Injectable, Instance, Token};
use crate::error::KeystoneError;
use crate::exception::{ExceptionFilter, FilterRef};
use crate::guard::{Guard, GuardRef};
use crate::interceptor::{Interceptor, InterceptorRef};
use crate::metadata::{self, MetadataRegistry, Subject};
use crate::websocket::{ErasedWsHandler, WsConnection, WsEvent, WsHandlerBinding, WsMessage};
use crate::BoxFuture;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A route method declaration: method, path, bindings and method-level
/// components.
///
/// # Example
/// ```ignore
/// Route::get(":id", "find_one")
///     .param(ParamBinding::param(0, "id"))
///     .guard::<OwnerGuard>()
/// ```
pub struct Route {
    http_method: HttpMethod,
    path: String,
    handler_name: &'static str,
    params: Vec<ParamBinding>,
    guards: Vec<GuardRef>,
    interceptors: Vec<InterceptorRef>,
    filters: Vec<FilterRef>,
    public: bool,
}

impl Route {
    pub fn new(http_method: HttpMethod, path: impl Into<String>, handler_name: &'static str) -> Self {
        Self {
            http_method,
            path: path.into(),
            handler_name,
            params: Vec::new(),
            guards: Vec::new(),
            interceptors: Vec::new(),
            filters: Vec::new(),
            public: false,
        }
    }

    pub fn get(path: impl Into<String>, handler_name: &'static str) -> Self {
        Self::new(HttpMethod::Get, path, handler_name)
    }

    pub fn post(path: impl Into<String>, handler_name: &'static str) -> Self {
        Self::new(HttpMethod::Post, path, handler_name)
    }

    pub fn put(path: impl Into<String>, handler_name: &'static str) -> Self {
        Self::new(HttpMethod::Put, path, handler_name)
    }

    pub fn patch(path: impl Into<String>, handler_name: &'static str) -> Self {
        Self::new(HttpMethod::Patch, path, handler_name)
    }

    pub fn delete(path: impl Into<String>, handler_name: &'static str) -> Self {
        Self::new(HttpMethod::Delete, path, handler_name)
    }

    pub fn param(mut self, binding: ParamBinding) -> Self {
        self.params.push(binding);
        self
    }

    pub fn guard<G: Guard + Injectable>(mut self) -> Self {
        self.guards.push(GuardRef::of::<G>());
        self
    }

    pub fn interceptor<I: Interceptor + Injectable>(mut self) -> Self {
        self.interceptors.push(InterceptorRef::of::<I>());
        self
    }

    pub fn filter<F: ExceptionFilter + Injectable>(mut self) -> Self {
        self.filters.push(FilterRef::of::<F>());
        self
    }

    /// Exempt this route from global guards
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }
}

/// Writes one controller's metadata into the registry.
pub struct ControllerDeclaration<'r, C> {
    registry: &'r mut MetadataRegistry,
    _controller: PhantomData<fn() -> C>,
}

impl<'r, C: Controller> ControllerDeclaration<'r, C> {
    pub fn new(registry: &'r mut MetadataRegistry) -> Self {
        Self {
            registry,
            _controller: PhantomData,
        }
    }

    fn class(&self) -> Subject {
        Subject::class::<C>()
    }

    /// Path prefix shared by every route of the controller
    pub fn path(&mut self, prefix: impl Into<String>) -> &mut Self {
        let class = self.class();
        self.registry
            .define(class, &metadata::CONTROLLER_PATH, prefix.into());
        self
    }

    pub fn tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let class = self.class();
        self.registry
            .extend(class, &metadata::API_TAGS, tags.into_iter().map(Into::into));
        self
    }

    pub fn guard<G: Guard + Injectable>(&mut self) -> &mut Self {
        let class = self.class();
        self.registry.append(class, &metadata::GUARDS, GuardRef::of::<G>());
        self
    }

    pub fn interceptor<I: Interceptor + Injectable>(&mut self) -> &mut Self {
        let class = self.class();
        self.registry
            .append(class, &metadata::INTERCEPTORS, InterceptorRef::of::<I>());
        self
    }

    pub fn filter<F: ExceptionFilter + Injectable>(&mut self) -> &mut Self {
        let class = self.class();
        self.registry.append(class, &metadata::FILTERS, FilterRef::of::<F>());
        self
    }

    /// Exempt every route of the controller from global guards
    pub fn public(&mut self) -> &mut Self {
        let class = self.class();
        self.registry.define(class, &metadata::PUBLIC, true);
        self
    }

    /// Expose a websocket gateway under `prefix + path`
    pub fn websocket(&mut self, path: impl Into<String>) -> &mut Self {
        let class = self.class();
        self.registry
            .define(class, &metadata::WEBSOCKET_PATH, path.into());
        self
    }

    /// Declare a route and the method that serves it
    pub fn route<F, Fut>(&mut self, route: Route, handler: F) -> &mut Self
    where
        F: Fn(Arc<C>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let class = self.class();
        let method = Subject::Method(Token::of::<C>(), route.handler_name);

        let erased: ErasedHandler = Arc::new(
            move |instance: Instance, arguments: Arguments| -> BoxFuture<'static, HandlerResult> {
                match instance.downcast::<C>() {
                    Ok(controller) => Box::pin(handler(controller, arguments)),
                    Err(_) => {
                        let error = KeystoneError::DowncastFailed {
                            type_name: std::any::type_name::<C>().to_string(),
                        };
                        Box::pin(async move { HandlerResult::Err(error.into()) })
                    }
                }
            },
        );

        self.registry.append(
            class,
            &metadata::ROUTES,
            RouteMetadata {
                http_method: route.http_method,
                path: route.path,
                handler_name: route.handler_name,
            },
        );
        self.registry.extend(method, &metadata::PARAMS, route.params);
        self.registry.extend(method, &metadata::GUARDS, route.guards);
        self.registry
            .extend(method, &metadata::INTERCEPTORS, route.interceptors);
        self.registry.extend(method, &metadata::FILTERS, route.filters);
        if route.public {
            self.registry.define(method, &metadata::PUBLIC, true);
        }
        self.registry.define(method, &metadata::ROUTE_HANDLER, erased);
        self
    }

    pub fn ws_open<F, Fut>(&mut self, handler_name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(Arc<C>, WsConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ws_binding(WsEvent::Open, handler_name, move |c, conn, _| handler(c, conn))
    }

    pub fn ws_message<F, Fut>(&mut self, handler_name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(Arc<C>, WsConnection, WsMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.ws_binding(
            WsEvent::Message,
            handler_name,
            move |c, conn, message: Option<WsMessage>| {
                let handler = Arc::clone(&handler);
                async move {
                    if let Some(message) = message {
                        handler(c, conn, message).await;
                    }
                }
            },
        )
    }

    pub fn ws_close<F, Fut>(&mut self, handler_name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(Arc<C>, WsConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ws_binding(WsEvent::Close, handler_name, move |c, conn, _| handler(c, conn))
    }

    pub fn ws_drain<F, Fut>(&mut self, handler_name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(Arc<C>, WsConnection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ws_binding(WsEvent::Drain, handler_name, move |c, conn, _| handler(c, conn))
    }

    fn ws_binding<F, Fut>(&mut self, event: WsEvent, handler_name: &'static str, handler: F) -> &mut Self
    where
        F: Fn(Arc<C>, WsConnection, Option<WsMessage>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let class = self.class();
        let erased: ErasedWsHandler = Arc::new(
            move |instance: Instance, conn: WsConnection, message: Option<WsMessage>| -> BoxFuture<'static, ()> {
                match instance.downcast::<C>() {
                    Ok(controller) => Box::pin(handler(controller, conn, message)),
                    Err(_) => {
                        tracing::error!(
                            controller = std::any::type_name::<C>(),
                            "WebSocket handler bound to a foreign instance"
                        );
                        Box::pin(async {})
                    }
                }
            },
        );
        self.registry.append(
            class,
            &metadata::WEBSOCKET_HANDLERS,
            WsHandlerBinding {
                event,
                handler_name,
                handler: erased,
            },
        );
        self
    }
}
