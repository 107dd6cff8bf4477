use crate::di::{Container, Token};
use crate::error::{KeystoneError, Result};
use std::fmt;
use std::sync::Arc;

/// Reference to a cross-cutting component type (guard, interceptor, filter).
///
/// Components are looked up in the container first. When that fails, for
/// example because a stateless guard was never listed as a provider, the type
/// is built on its own with no dependencies available.
pub struct ComponentRef<T: ?Sized> {
    token: Token,
    resolve: fn(&Container) -> Result<Arc<T>>,
    fallback: fn() -> Result<Arc<T>>,
}

impl<T: ?Sized> ComponentRef<T> {
    pub(crate) fn new<C: 'static>(
        resolve: fn(&Container) -> Result<Arc<T>>,
        fallback: fn() -> Result<Arc<T>>,
    ) -> Self {
        Self {
            token: Token::of::<C>(),
            resolve,
            fallback,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    /// Resolve from `container`, falling back to a standalone construction.
    pub fn instantiate(&self, container: &Container) -> Result<Arc<T>> {
        match (self.resolve)(container) {
            Ok(component) => Ok(component),
            Err(err) => {
                tracing::debug!(
                    component = self.token.short_name(),
                    reason = %err,
                    "Component not resolvable from container, constructing standalone"
                );
                (self.fallback)().map_err(|fallback| {
                    KeystoneError::construction_failed(
                        self.token.name(),
                        format!("{err}; standalone construction: {fallback}"),
                    )
                })
            }
        }
    }
}

impl<T: ?Sized> Clone for ComponentRef<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            resolve: self.resolve,
            fallback: self.fallback,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ComponentRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentRef({})", self.token)
    }
}
