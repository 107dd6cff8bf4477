//! Controllers: request handlers grouped under a path prefix.
//!
//! A controller is an injectable type that records its routes, parameter
//! bindings and cross-cutting components into the metadata registry through a
//! [`ControllerDeclaration`]. The `#[controller]` and `#[routes]` macros write
//! that declaration for you.

mod declaration;
mod descriptor;
mod params;

pub use declaration::{ControllerDeclaration, Route};
pub use descriptor::{ControllerDescriptor, MethodOverrides, RouteDescriptor, RouteMetadata, WebSocketDescriptor};
pub use params::{Arguments, ParamBinding, ParamSource, extract_arguments};

pub use crate::websocket::{ErasedWsHandler, WsHandlerBinding};

use crate::di::{Injectable, Instance};
use crate::exception::Exception;
use crate::metadata::MetadataRegistry;
use crate::{BoxFuture, HandlerResult};
use axum::response::{IntoResponse, Response};

/// A route method with its controller type erased
pub type ErasedHandler =
    std::sync::Arc<dyn Fn(Instance, Arguments) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// An injectable type that serves routes.
pub trait Controller: Injectable {
    /// Record class, route and websocket metadata for this controller
    fn declare(declaration: &mut ControllerDeclaration<'_, Self>);
}

/// Run `C`'s declaration against `registry`.
pub fn declare<C: Controller>(registry: &mut MetadataRegistry) {
    let mut declaration = ControllerDeclaration::<C>::new(registry);
    C::declare(&mut declaration);
}

/// Turn a handler's return value into a pipeline result.
pub fn respond<T, E>(result: Result<T, E>) -> HandlerResult
where
    T: IntoResponse,
    E: Into<Exception>,
{
    result.map(IntoResponse::into_response).map_err(Into::into)
}

/// Convenience for handlers that always succeed.
pub fn ok<T: IntoResponse>(value: T) -> Result<Response, Exception> {
    Ok(value.into_response())
}
