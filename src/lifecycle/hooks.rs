//! Lifecycle hook traits and their type-erased dispatch

use super::{LifecycleError, Result};
use crate::BoxFuture;
use crate::di::Instance;
use async_trait::async_trait;
use std::marker::PhantomData;

/// Called once after every provider and controller has been constructed
///
/// Hooks run sequentially in construction order, so every dependency of a
/// provider has already finished its own `on_module_init`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Injectable)]
/// #[lifecycle(init)]
/// pub struct DatabaseService {
///     pool: OnceLock<Pool>,
/// }
///
/// #[async_trait]
/// impl OnModuleInit for DatabaseService {
///     async fn on_module_init(&self) -> Result<(), LifecycleError> {
///         let pool = Pool::connect(URL).await
///             .map_err(|e| LifecycleError::init_failed(e.to_string()))?;
///         let _ = self.pool.set(pool);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait OnModuleInit: Send + Sync {
    async fn on_module_init(&self) -> Result<()>;
}

/// Called once on shutdown, in reverse construction order
#[async_trait]
pub trait OnModuleDestroy: Send + Sync {
    async fn on_module_destroy(&self) -> Result<()>;
}

type HookFn = fn(Instance) -> BoxFuture<'static, Result<()>>;

/// The hooks a provider type takes part in.
///
/// Returned from [`Injectable::lifecycle`](crate::di::Injectable::lifecycle);
/// only types that implement the matching trait can opt in.
pub struct LifecycleHooks<T> {
    hooks: ErasedHooks,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> LifecycleHooks<T> {
    pub fn new() -> Self {
        Self {
            hooks: ErasedHooks::none(),
            _marker: PhantomData,
        }
    }

    pub fn with_init(mut self) -> Self
    where
        T: OnModuleInit,
    {
        self.hooks.init = Some(call_init::<T> as HookFn);
        self
    }

    pub fn with_destroy(mut self) -> Self
    where
        T: OnModuleDestroy,
    {
        self.hooks.destroy = Some(call_destroy::<T> as HookFn);
        self
    }

    pub fn erase(self) -> ErasedHooks {
        self.hooks
    }
}

impl<T: Send + Sync + 'static> Default for LifecycleHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hooks of one registration with the concrete type erased.
#[derive(Clone, Copy, Default)]
pub struct ErasedHooks {
    init: Option<HookFn>,
    destroy: Option<HookFn>,
}

impl ErasedHooks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }

    pub fn has_destroy(&self) -> bool {
        self.destroy.is_some()
    }

    pub(crate) fn init(&self, instance: Instance) -> Option<BoxFuture<'static, Result<()>>> {
        self.init.map(|hook| hook(instance))
    }

    pub(crate) fn destroy(&self, instance: Instance) -> Option<BoxFuture<'static, Result<()>>> {
        self.destroy.map(|hook| hook(instance))
    }
}

fn downcast<T: Send + Sync + 'static>(instance: Instance) -> Result<std::sync::Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| LifecycleError::hook_failed(std::any::type_name::<T>(), "instance type mismatch"))
}

fn call_init<T: OnModuleInit + 'static>(instance: Instance) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let service = downcast::<T>(instance)?;
        service.on_module_init().await
    })
}

fn call_destroy<T: OnModuleDestroy + 'static>(instance: Instance) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let service = downcast::<T>(instance)?;
        service.on_module_destroy().await
    })
}
