//! Lifecycle Manager
//!
//! Runs the hooks of every constructed provider and controller.

use super::{ErasedHooks, LifecycleError, Result};
use crate::di::{Container, Instance, Token};
use std::sync::Arc;

struct LifecycleHook {
    token: Token,
    instance: Instance,
    hooks: ErasedHooks,
}

/// Drives `OnModuleInit` / `OnModuleDestroy` over a container's instances
///
/// Hooks are captured in construction order: init walks that list forwards,
/// destroy walks it backwards so dependents are torn down before their
/// dependencies.
///
/// # Example
///
/// ```rust,ignore
/// let manager = LifecycleManager::from_container(&container);
/// manager.call_module_init().await?;
/// // ... application runs ...
/// manager.call_module_destroy().await;
/// ```
#[derive(Default)]
pub struct LifecycleManager {
    hooks: Vec<LifecycleHook>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the constructed instances of `container`.
    pub fn from_container(container: &Container) -> Self {
        let hooks = container
            .instances()
            .into_iter()
            .filter(|resolved| resolved.hooks.has_init() || resolved.hooks.has_destroy())
            .map(|resolved| LifecycleHook {
                token: resolved.token,
                instance: resolved.instance,
                hooks: resolved.hooks,
            })
            .collect();
        Self { hooks }
    }

    /// Execute all OnModuleInit hooks sequentially; the first failure aborts.
    pub async fn call_module_init(&self) -> Result<()> {
        tracing::info!("Calling OnModuleInit hooks...");

        let mut executed = 0;
        for hook in &self.hooks {
            let Some(future) = hook.hooks.init(Arc::clone(&hook.instance)) else {
                continue;
            };
            let name = hook.token.short_name();
            tracing::debug!("Initializing: {}", name);
            future.await.map_err(|e| {
                tracing::error!("OnModuleInit failed for {}: {}", name, e);
                LifecycleError::hook_failed(name, e.to_string())
            })?;
            executed += 1;
        }

        tracing::info!("OnModuleInit complete ({} hooks executed)", executed);
        Ok(())
    }

    /// Execute all OnModuleDestroy hooks in **reverse order**.
    ///
    /// Failures are logged and the remaining hooks still run.
    pub async fn call_module_destroy(&self) -> usize {
        tracing::info!("Calling OnModuleDestroy hooks...");

        let mut failures = 0;
        for hook in self.hooks.iter().rev() {
            let Some(future) = hook.hooks.destroy(Arc::clone(&hook.instance)) else {
                continue;
            };
            let name = hook.token.short_name();
            tracing::debug!("Destroying: {}", name);
            if let Err(e) = future.await {
                tracing::error!("OnModuleDestroy failed for {}: {}", name, e);
                failures += 1;
            }
        }

        tracing::info!("OnModuleDestroy complete ({} failures)", failures);
        failures
    }

    pub fn init_hook_count(&self) -> usize {
        self.hooks.iter().filter(|h| h.hooks.has_init()).count()
    }

    pub fn destroy_hook_count(&self) -> usize {
        self.hooks.iter().filter(|h| h.hooks.has_destroy()).count()
    }
}
