//! Boundary between compiled pipelines and the HTTP/WebSocket server.

mod axum;
mod socket;

pub use self::axum::{AxumTransport, axum_path};

use crate::pipeline::{CompiledApplication, CompiledGateway, CompiledRoute};
use std::sync::Arc;

/// A server that compiled routes and gateways can be mounted on.
///
/// The transport owns request I/O: it builds the [`RequestContext`] for each
/// request, validates the body and query against the route's schemas and
/// renders whatever error the pipeline could not recover from.
///
/// [`RequestContext`]: crate::context::RequestContext
pub trait Transport {
    fn route(&mut self, route: Arc<CompiledRoute>);

    fn websocket(&mut self, gateway: Arc<CompiledGateway>);
}

/// Mount every route and gateway of `compiled` on `transport`.
pub fn mount<T: Transport + ?Sized>(transport: &mut T, compiled: &CompiledApplication) {
    for route in &compiled.routes {
        transport.route(Arc::clone(route));
    }
    for gateway in &compiled.gateways {
        transport.websocket(Arc::clone(gateway));
    }
}
