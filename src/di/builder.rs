use crate::di::{Container, Provider};
use crate::error::Result;

/// Builder for constructing a dependency injection container
///
/// Providers and controllers are collected first; the container is immutable
/// once built. Controllers are constructed eagerly during [`build`](Self::build)
/// in the order they were added, so any missing dependency fails startup.
///
/// # Example
/// ```ignore
/// let container = ContainerBuilder::new()
///     .value(DatabaseUrl::from_env())
///     .provider(Provider::of::<UserRepository>())
///     .controller(Provider::of::<UserController>())
///     .build()?;
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    providers: Vec<Provider>,
    controllers: Vec<Provider>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lazily constructed provider
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Register an already constructed value
    pub fn value<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.provider(Provider::value(value))
    }

    /// Register a controller; it is constructed during `build`
    pub fn controller(mut self, controller: Provider) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Build the container and construct every controller.
    ///
    /// # Errors
    /// Fails if a controller or one of its transitive dependencies cannot be
    /// constructed.
    pub fn build(self) -> Result<Container> {
        let mut container = Container::new();
        for provider in self.providers {
            container.register(provider);
        }
        let controllers: Vec<_> = self.controllers.iter().map(Provider::token).collect();
        for controller in self.controllers {
            container.register(controller);
        }

        for token in controllers {
            container.resolve_token(token)?;
            tracing::debug!(controller = token.short_name(), "Controller instantiated");
        }
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::{Injectable, Token};
    use crate::error::KeystoneError;
    use std::sync::Arc;

    struct Settings {
        prefix: &'static str,
    }

    struct Greeter {
        settings: Arc<Settings>,
    }

    impl Injectable for Greeter {
        fn dependencies() -> Vec<Token> {
            vec![Token::of::<Settings>()]
        }

        fn inject(container: &Container) -> Result<Self> {
            Ok(Self {
                settings: container.resolve()?,
            })
        }
    }

    struct Unused;

    impl Injectable for Unused {
        fn inject(_: &Container) -> Result<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn test_controllers_are_built_eagerly() {
        let container = ContainerBuilder::new()
            .value(Settings { prefix: "hello" })
            .provider(Provider::of::<Unused>())
            .controller(Provider::of::<Greeter>())
            .build()
            .unwrap();

        assert!(container.is_constructed(Token::of::<Greeter>()));
        assert!(!container.is_constructed(Token::of::<Unused>()));
        let greeter = container.resolve::<Greeter>().unwrap();
        assert_eq!(greeter.settings.prefix, "hello");
    }

    #[test]
    fn test_missing_controller_dependency_fails_build() {
        let result = ContainerBuilder::new()
            .controller(Provider::of::<Greeter>())
            .build();
        assert!(matches!(
            result,
            Err(KeystoneError::DependencyNotFound { .. })
        ));
    }
}
