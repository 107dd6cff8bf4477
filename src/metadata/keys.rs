use super::{ListKey, MetadataKey};
use crate::controller::{ErasedHandler, ParamBinding, RouteMetadata, WsHandlerBinding};
use crate::exception::FilterRef;
use crate::guard::GuardRef;
use crate::interceptor::InterceptorRef;
use crate::module::ModuleDescriptor;

/// Composition of a module (on the module's class subject)
pub const MODULE: MetadataKey<ModuleDescriptor> = MetadataKey::new("keystone:module");

/// Path prefix of a controller
pub const CONTROLLER_PATH: MetadataKey<String> = MetadataKey::new("keystone:controller:path");

/// Documentation tags of a controller
pub const API_TAGS: ListKey<String> = ListKey::new("keystone:api-tags");

/// Routes declared on a controller, in declaration order
pub const ROUTES: ListKey<RouteMetadata> = ListKey::new("keystone:routes");

/// Parameter bindings of a handler method
pub const PARAMS: ListKey<ParamBinding> = ListKey::new("keystone:params");

/// Invocable handler of a route method
pub const ROUTE_HANDLER: MetadataKey<ErasedHandler> = MetadataKey::new("keystone:route:handler");

pub const GUARDS: ListKey<GuardRef> = ListKey::new("keystone:guards");

pub const INTERCEPTORS: ListKey<InterceptorRef> = ListKey::new("keystone:interceptors");

pub const FILTERS: ListKey<FilterRef> = ListKey::new("keystone:filters");

/// Exempts a controller or method from global guards
pub const PUBLIC: MetadataKey<bool> = MetadataKey::new("keystone:public");

/// WebSocket path suffix of a controller
pub const WEBSOCKET_PATH: MetadataKey<String> = MetadataKey::new("keystone:websocket:path");

pub const WEBSOCKET_HANDLERS: ListKey<WsHandlerBinding> = ListKey::new("keystone:websocket:handlers");
