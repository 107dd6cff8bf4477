use super::{ErasedHandler, ParamBinding};
use crate::context::HttpMethod;
use crate::di::Token;
use crate::exception::FilterRef;
use crate::guard::GuardRef;
use crate::interceptor::InterceptorRef;
use crate::metadata::{self, MetadataRegistry, Subject};
use crate::websocket::WebSocketHandlers;

/// A route as recorded on the controller class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMetadata {
    pub http_method: HttpMethod,
    pub path: String,
    pub handler_name: &'static str,
}

/// Guards, interceptors, filters and public marker of one handler method.
#[derive(Debug, Clone, Default)]
pub struct MethodOverrides {
    pub guards: Vec<GuardRef>,
    pub interceptors: Vec<InterceptorRef>,
    pub filters: Vec<FilterRef>,
    pub public: bool,
}

/// One declared route with everything attached to its method.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub http_method: HttpMethod,
    pub path: String,
    pub handler_name: &'static str,
    pub params: Vec<ParamBinding>,
    pub overrides: MethodOverrides,
    pub handler: Option<ErasedHandler>,
}

/// WebSocket gateway of a controller.
#[derive(Clone)]
pub struct WebSocketDescriptor {
    pub path: String,
    pub handlers: WebSocketHandlers,
}

/// Everything recorded about one controller, read back from the registry.
#[derive(Clone)]
pub struct ControllerDescriptor {
    pub token: Token,
    pub path_prefix: String,
    pub routes: Vec<RouteDescriptor>,
    pub api_tags: Vec<String>,
    pub guards: Vec<GuardRef>,
    pub interceptors: Vec<InterceptorRef>,
    pub filters: Vec<FilterRef>,
    pub public: bool,
    pub websocket: Option<WebSocketDescriptor>,
}

impl ControllerDescriptor {
    /// Materialize the descriptor of `token`. Missing metadata reads as empty.
    pub fn from_registry(token: Token, registry: &MetadataRegistry) -> Self {
        let class = Subject::Class(token);

        let routes = registry
            .list(class, &metadata::ROUTES)
            .iter()
            .map(|route| {
                let method = Subject::Method(token, route.handler_name);
                RouteDescriptor {
                    http_method: route.http_method,
                    path: route.path.clone(),
                    handler_name: route.handler_name,
                    params: registry.list(method, &metadata::PARAMS).to_vec(),
                    overrides: MethodOverrides {
                        guards: registry.list(method, &metadata::GUARDS).to_vec(),
                        interceptors: registry.list(method, &metadata::INTERCEPTORS).to_vec(),
                        filters: registry.list(method, &metadata::FILTERS).to_vec(),
                        public: registry.get_or_default(method, &metadata::PUBLIC),
                    },
                    handler: registry.get(method, &metadata::ROUTE_HANDLER).cloned(),
                }
            })
            .collect();

        let websocket = registry
            .get(class, &metadata::WEBSOCKET_PATH)
            .map(|path| WebSocketDescriptor {
                path: path.clone(),
                handlers: WebSocketHandlers::from_bindings(
                    registry.list(class, &metadata::WEBSOCKET_HANDLERS),
                ),
            });

        Self {
            token,
            path_prefix: registry.get_or_default(class, &metadata::CONTROLLER_PATH),
            routes,
            api_tags: registry.list(class, &metadata::API_TAGS).to_vec(),
            guards: registry.list(class, &metadata::GUARDS).to_vec(),
            interceptors: registry.list(class, &metadata::INTERCEPTORS).to_vec(),
            filters: registry.list(class, &metadata::FILTERS).to_vec(),
            public: registry.get_or_default(class, &metadata::PUBLIC),
            websocket,
        }
    }

    pub fn name(&self) -> &'static str {
        self.token.short_name()
    }
}
