mod graph;

pub use graph::{ModuleGraph, ResolvedModules};

use crate::controller::Controller;
use crate::di::{Injectable, Provider, Token};
use crate::metadata::MetadataRegistry;

/// Trait for application modules
///
/// Modules are typically defined using the `#[module]` macro, which implements
/// this trait from the listed imports, controllers and providers.
///
/// # Example
/// ```ignore
/// use keystone::prelude::*;
///
/// #[module(
///     imports = [DatabaseModule],
///     controllers = [UserController],
///     providers = [UserService, UserRepository],
/// )]
/// pub struct AppModule;
/// ```
pub trait Module: 'static {
    fn descriptor() -> ModuleDescriptor;
}

/// Reference to a module type, usable as an import edge.
#[derive(Clone, Copy)]
pub struct ModuleRef {
    token: Token,
    descriptor: fn() -> ModuleDescriptor,
}

impl ModuleRef {
    pub fn of<M: Module>() -> Self {
        Self {
            token: Token::of::<M>(),
            descriptor: M::descriptor,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn descriptor(&self) -> ModuleDescriptor {
        (self.descriptor)()
    }
}

impl std::fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModuleRef({})", self.token)
    }
}

/// A controller registration: how to build it and how to record its metadata.
#[derive(Clone)]
pub struct ControllerRef {
    provider: Provider,
    declare: fn(&mut MetadataRegistry),
}

impl ControllerRef {
    pub fn of<C: Controller>() -> Self {
        Self {
            provider: Provider::of::<C>(),
            declare: crate::controller::declare::<C>,
        }
    }

    pub fn token(&self) -> Token {
        self.provider.token()
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub(crate) fn declare(&self, registry: &mut MetadataRegistry) {
        (self.declare)(registry)
    }
}

/// Composition of one module. Immutable once returned by [`Module::descriptor`].
#[derive(Clone, Default)]
pub struct ModuleDescriptor {
    pub imports: Vec<ModuleRef>,
    pub controllers: Vec<ControllerRef>,
    pub providers: Vec<Provider>,
    /// Recorded for documentation; visibility is not scoped by exports.
    pub exports: Vec<Token>,
}

impl ModuleDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import<M: Module>(mut self) -> Self {
        self.imports.push(ModuleRef::of::<M>());
        self
    }

    pub fn controller<C: Controller>(mut self) -> Self {
        self.controllers.push(ControllerRef::of::<C>());
        self
    }

    pub fn provider<P: Injectable>(mut self) -> Self {
        self.providers.push(Provider::of::<P>());
        self
    }

    /// Provide an already constructed value
    pub fn value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.providers.push(Provider::value(value));
        self
    }

    pub fn export<T: 'static>(mut self) -> Self {
        self.exports.push(Token::of::<T>());
        self
    }
}
