use super::{ApplicationOptions, CompiledGateway, CompiledRoute, Pipeline, normalize_path, route_shape};
use crate::context::HttpMethod;
use crate::controller::{ControllerDescriptor, ParamSource, RouteDescriptor};
use crate::di::{ComponentRef, Container, Token};
use crate::error::{KeystoneError, Result};
use crate::exception::ExceptionFilter;
use crate::guard::Guard;
use crate::interceptor::Interceptor;
use crate::metadata::MetadataRegistry;
use crate::validation::ValidationSchema;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Output of compiling every controller of an application.
#[derive(Default)]
pub struct CompiledApplication {
    /// `(controller name, path prefix)` in mount order
    pub controllers: Vec<(&'static str, String)>,
    pub routes: Vec<Arc<CompiledRoute>>,
    pub gateways: Vec<Arc<CompiledGateway>>,
}

/// Turns controller metadata into executable pipelines.
///
/// Cross-cutting components are instantiated on first use and shared by
/// every route that references the same type.
pub struct PipelineCompiler<'a> {
    container: &'a Container,
    registry: &'a MetadataRegistry,
    options: &'a ApplicationOptions,
    guards: HashMap<Token, Arc<dyn Guard>>,
    interceptors: HashMap<Token, Arc<dyn Interceptor>>,
    filters: HashMap<Token, Arc<dyn ExceptionFilter>>,
}

impl<'a> PipelineCompiler<'a> {
    pub fn new(
        container: &'a Container,
        registry: &'a MetadataRegistry,
        options: &'a ApplicationOptions,
    ) -> Self {
        Self {
            container,
            registry,
            options,
            guards: HashMap::new(),
            interceptors: HashMap::new(),
            filters: HashMap::new(),
        }
    }

    /// Compile the routes and gateways of `controllers`, in order.
    ///
    /// # Errors
    /// Fails when a controller is not constructed, a component cannot be
    /// built, a declared schema does not compile or two handlers claim the
    /// same method and path.
    pub fn compile(mut self, controllers: impl IntoIterator<Item = Token>) -> Result<CompiledApplication> {
        let mut compiled = CompiledApplication::default();
        let mut claims = RouteClaims::default();
        if let Some(path) = &self.options.openapi_path {
            claims.claim(HttpMethod::Get, &normalize_path(&[path.as_str(), "json"]), "OpenAPI document".into())?;
        }

        for token in controllers {
            let descriptor = ControllerDescriptor::from_registry(token, self.registry);
            compiled
                .controllers
                .push((descriptor.name(), descriptor.path_prefix.clone()));

            for route in &descriptor.routes {
                if let Some(route) = self.compile_route(&descriptor, route)? {
                    claims.claim(
                        route.method,
                        &route.path,
                        format!("{}::{}", route.controller, route.handler_name),
                    )?;
                    compiled.routes.push(Arc::new(route));
                }
            }

            if let Some(websocket) = &descriptor.websocket {
                if websocket.handlers.is_empty() {
                    tracing::warn!(
                        controller = descriptor.name(),
                        "WebSocket path declared without lifecycle handlers, skipping"
                    );
                    continue;
                }
                let path = normalize_path(&[descriptor.path_prefix.as_str(), websocket.path.as_str()]);
                claims.claim(HttpMethod::Get, &path, format!("{} websocket", descriptor.name()))?;
                compiled.gateways.push(Arc::new(CompiledGateway {
                    path,
                    controller: descriptor.name(),
                    instance: self.container.resolve_token(token)?,
                    handlers: websocket.handlers.clone(),
                }));
            }
        }

        Ok(compiled)
    }

    fn compile_route(
        &mut self,
        controller: &ControllerDescriptor,
        route: &RouteDescriptor,
    ) -> Result<Option<CompiledRoute>> {
        let Some(handler) = route.handler.clone() else {
            tracing::warn!(
                controller = controller.name(),
                handler = route.handler_name,
                "Route declared without a handler, skipping"
            );
            return Ok(None);
        };

        let path = normalize_path(&[controller.path_prefix.as_str(), route.path.as_str()]);
        let public = controller.public || route.overrides.public;

        let mut guard_refs = Vec::new();
        if !public {
            guard_refs.extend(self.options.global_guards.iter().cloned());
        }
        guard_refs.extend(controller.guards.iter().cloned());
        guard_refs.extend(route.overrides.guards.iter().cloned());

        let interceptor_refs: Vec<_> = self
            .options
            .global_interceptors
            .iter()
            .chain(&controller.interceptors)
            .chain(&route.overrides.interceptors)
            .cloned()
            .collect();

        let filter_refs: Vec<_> = self
            .options
            .global_filters
            .iter()
            .chain(&controller.filters)
            .chain(&route.overrides.filters)
            .cloned()
            .collect();

        let guards = instantiate_all(&mut self.guards, self.container, &guard_refs)?;
        let interceptors = instantiate_all(&mut self.interceptors, self.container, &interceptor_refs)?;
        let filters = instantiate_all(&mut self.filters, self.container, &filter_refs)?;

        let security = match (&self.options.security_scheme, public) {
            (Some(scheme), false) => vec![scheme.clone()],
            _ => Vec::new(),
        };

        let pipeline = Pipeline::new(
            guards,
            interceptors,
            filters,
            self.container.resolve_token(controller.token)?,
            handler,
            route.params.clone(),
        );

        Ok(Some(CompiledRoute {
            method: route.http_method,
            path,
            controller: controller.name(),
            handler_name: route.handler_name,
            api_tags: controller.api_tags.clone(),
            public,
            security,
            binds_body: route.params.iter().any(|binding| binding.source == ParamSource::Body),
            body_schema: schema_for(route, ParamSource::Body)?,
            query_schema: schema_for(route, ParamSource::Query)?,
            pipeline,
        }))
    }
}

/// Mounted `(method, path shape)` pairs and who declared them.
#[derive(Default)]
struct RouteClaims {
    owners: HashMap<(HttpMethod, String), String>,
    /// First concrete path seen for each shape
    paths: HashMap<String, String>,
}

impl RouteClaims {
    fn claim(&mut self, method: HttpMethod, path: &str, owner: String) -> Result<()> {
        let shape = route_shape(path);
        match self.paths.entry(shape.clone()) {
            Entry::Occupied(existing) if existing.get() != path => {
                return Err(KeystoneError::ModuleRegistrationFailed {
                    message: format!(
                        "Route {path} ({owner}) uses different parameter names than {}",
                        existing.get()
                    ),
                });
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(path.to_string());
            }
        }

        match self.owners.entry((method, shape)) {
            Entry::Occupied(existing) => Err(KeystoneError::ModuleRegistrationFailed {
                message: format!(
                    "Duplicate route {method} {path}: declared by {} and {owner}",
                    existing.get()
                ),
            }),
            Entry::Vacant(slot) => {
                slot.insert(owner);
                Ok(())
            }
        }
    }
}

fn instantiate_all<T: ?Sized>(
    cache: &mut HashMap<Token, Arc<T>>,
    container: &Container,
    refs: &[ComponentRef<T>],
) -> Result<Vec<Arc<T>>> {
    refs.iter()
        .map(|component| {
            if let Some(instance) = cache.get(&component.token()) {
                return Ok(Arc::clone(instance));
            }
            let instance = component.instantiate(container)?;
            cache.insert(component.token(), Arc::clone(&instance));
            Ok(instance)
        })
        .collect()
}

/// The first schema declared for `source` on the route.
fn schema_for(route: &RouteDescriptor, source: ParamSource) -> Result<Option<ValidationSchema>> {
    route
        .params
        .iter()
        .filter(|binding| binding.source == source)
        .find_map(|binding| binding.schema.clone())
        .map(ValidationSchema::compile)
        .transpose()
}
