use crate::di::{Container, Token};
use crate::error::Result;
use crate::lifecycle::{ErasedHooks, LifecycleHooks};
use std::any::Any;
use std::sync::Arc;

/// A type-erased singleton held by the container.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

/// Trait for types that can be constructed by the DI container
///
/// This trait is typically implemented automatically via the `#[derive(Injectable)]` macro,
/// which lists every `Arc<T>` field as a dependency in declaration order.
///
/// # Example
/// ```ignore
/// use keystone::prelude::*;
///
/// #[derive(Injectable)]
/// pub struct UserService {
///     // Resolved from the container before UserService is built
///     repository: Arc<UserRepository>,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Tokens this type needs, in constructor order.
    fn dependencies() -> Vec<Token> {
        Vec::new()
    }

    /// Create an instance by resolving dependencies from the container
    ///
    /// # Errors
    /// Returns an error if any required dependency is not registered.
    fn inject(container: &Container) -> Result<Self>;

    /// Lifecycle hooks this type takes part in.
    fn lifecycle() -> LifecycleHooks<Self> {
        LifecycleHooks::new()
    }
}

/// Registration entry for one provider or controller.
#[derive(Clone)]
pub struct Provider {
    token: Token,
    dependencies: fn() -> Vec<Token>,
    factory: Factory,
    hooks: fn() -> ErasedHooks,
}

impl Provider {
    /// Register `T` to be built by its [`Injectable`] implementation.
    pub fn of<T: Injectable>() -> Self {
        Self {
            token: Token::of::<T>(),
            dependencies: T::dependencies,
            factory: Arc::new(|container: &Container| {
                T::inject(container).map(|instance| Arc::new(instance) as Instance)
            }),
            hooks: || T::lifecycle().erase(),
        }
    }

    /// Register an already constructed value under its own type.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        let instance: Instance = Arc::new(value);
        Self {
            token: Token::of::<T>(),
            dependencies: Vec::new,
            factory: Arc::new(move |_: &Container| Ok(Arc::clone(&instance))),
            hooks: ErasedHooks::none,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn dependencies(&self) -> Vec<Token> {
        (self.dependencies)()
    }

    pub(crate) fn construct(&self, container: &Container) -> Result<Instance> {
        (self.factory)(container)
    }

    pub(crate) fn hooks(&self) -> ErasedHooks {
        (self.hooks)()
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
