use crate::di::Injectable;
use crate::exception::{ExceptionFilter, FilterRef};
use crate::guard::{Guard, GuardRef};
use crate::interceptor::{Interceptor, InterceptorRef};

/// Application-wide pipeline settings.
///
/// Global guards apply to every non-public route; global interceptors and
/// filters apply to every route and run before controller and method ones.
#[derive(Clone, Default)]
pub struct ApplicationOptions {
    pub global_guards: Vec<GuardRef>,
    pub global_interceptors: Vec<InterceptorRef>,
    pub global_filters: Vec<FilterRef>,
    /// Security scheme recorded on non-public routes
    pub security_scheme: Option<String>,
    /// Serve an OpenAPI document of the route table at `{path}/json`
    pub openapi_path: Option<String>,
}

impl ApplicationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard<G: Guard + Injectable>(mut self) -> Self {
        self.global_guards.push(GuardRef::of::<G>());
        self
    }

    pub fn interceptor<I: Interceptor + Injectable>(mut self) -> Self {
        self.global_interceptors.push(InterceptorRef::of::<I>());
        self
    }

    pub fn filter<F: ExceptionFilter + Injectable>(mut self) -> Self {
        self.global_filters.push(FilterRef::of::<F>());
        self
    }

    pub fn security_scheme(mut self, name: impl Into<String>) -> Self {
        self.security_scheme = Some(name.into());
        self
    }

    pub fn openapi(mut self, path: impl Into<String>) -> Self {
        self.openapi_path = Some(path.into());
        self
    }
}
