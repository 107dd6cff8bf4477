use super::{ControllerRef, ModuleRef};
use crate::di::{Provider, Token};
use crate::metadata::{self, MetadataRegistry, Subject};
use std::collections::HashSet;

/// Flattened view of every module reachable from a root.
pub struct ResolvedModules {
    /// Reachable modules in visit order (root first)
    pub modules: Vec<Token>,
    /// Union of all providers, first declaration wins
    pub providers: Vec<Provider>,
    /// Controllers grouped per module, in module-then-declaration order
    pub controllers: Vec<(Token, ControllerRef)>,
}

impl ResolvedModules {
    pub fn controller_tokens(&self) -> impl Iterator<Item = Token> + '_ {
        self.controllers.iter().map(|(_, controller)| controller.token())
    }
}

/// Reachability traversal over module imports.
pub struct ModuleGraph;

impl ModuleGraph {
    /// Walk `root` and its imports depth-first.
    ///
    /// Every module is visited once, even when imported along several paths.
    /// Each visited descriptor is recorded under [`metadata::MODULE`] and every
    /// controller records its own class and method metadata into `registry`.
    pub fn resolve(root: ModuleRef, registry: &mut MetadataRegistry) -> ResolvedModules {
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        let mut resolved = ResolvedModules {
            modules: Vec::new(),
            providers: Vec::new(),
            controllers: Vec::new(),
        };
        let mut seen_providers = HashSet::new();
        let mut seen_controllers = HashSet::new();

        while let Some(module) = stack.pop() {
            let token = module.token();
            if !visited.insert(token) {
                continue;
            }

            let descriptor = module.descriptor();
            tracing::debug!(
                module = token.short_name(),
                imports = descriptor.imports.len(),
                providers = descriptor.providers.len(),
                controllers = descriptor.controllers.len(),
                "Module resolved"
            );

            stack.extend(
                descriptor
                    .imports
                    .iter()
                    .rev()
                    .filter(|import| !visited.contains(&import.token()))
                    .copied(),
            );

            for provider in &descriptor.providers {
                if seen_providers.insert(provider.token()) {
                    resolved.providers.push(provider.clone());
                }
            }
            for controller in &descriptor.controllers {
                if seen_controllers.insert(controller.token()) {
                    controller.declare(registry);
                    resolved.controllers.push((token, controller.clone()));
                }
            }

            resolved.modules.push(token);
            registry.define(Subject::Class(token), &metadata::MODULE, descriptor);
        }

        resolved
    }
}
