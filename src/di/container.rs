use crate::di::{Instance, Provider, Token};
use crate::error::{KeystoneError, Result};
use crate::lifecycle::ErasedHooks;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Singleton container for one application instance.
///
/// Only tokens registered as providers or controllers can be resolved. Each
/// one is constructed at most once; dependencies are built first (post-order)
/// and the resulting instance is memoized under its token. Two containers never
/// share instances, so several applications can live in one process.
pub struct Container {
    registrations: HashMap<Token, Provider>,
    declared: Vec<Token>,
    instances: DashMap<Token, Instance>,
    construction_order: Mutex<Vec<Token>>,
    resolving: Mutex<Vec<Token>>,
}

/// A constructed singleton together with the hooks it registered.
#[derive(Clone)]
pub struct ResolvedInstance {
    pub token: Token,
    pub instance: Instance,
    pub hooks: ErasedHooks,
}

impl Container {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            declared: Vec::new(),
            instances: DashMap::new(),
            construction_order: Mutex::new(Vec::new()),
            resolving: Mutex::new(Vec::new()),
        }
    }

    /// Add a provider to the allowed set. The first registration of a token wins.
    pub(crate) fn register(&mut self, provider: Provider) -> &mut Self {
        let token = provider.token();
        if !self.registrations.contains_key(&token) {
            self.declared.push(token);
            self.registrations.insert(token, provider);
        }
        self
    }

    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let token = Token::of::<T>();
        self.resolve_token(token)?
            .downcast::<T>()
            .map_err(|_| KeystoneError::DowncastFailed {
                type_name: token.name().to_string(),
            })
    }

    /// Return the memoized instance for `token`, constructing it and its
    /// dependencies on first use.
    pub fn resolve_token(&self, token: Token) -> Result<Instance> {
        if let Some(instance) = self.instances.get(&token) {
            return Ok(Arc::clone(instance.value()));
        }

        let provider = self
            .registrations
            .get(&token)
            .ok_or_else(|| KeystoneError::not_found(token.name()))?;

        self.enter(token)?;
        let result = self.construct(provider);
        self.leave(token);
        result
    }

    fn construct(&self, provider: &Provider) -> Result<Instance> {
        let token = provider.token();
        for dependency in provider.dependencies() {
            self.resolve_token(dependency)?;
        }

        let instance = provider.construct(self)?;
        let instance = Arc::clone(
            self.instances
                .entry(token)
                .or_insert_with(|| {
                    self.construction_order
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(token);
                    instance
                })
                .value(),
        );
        tracing::debug!(provider = token.short_name(), "Instance constructed");
        Ok(instance)
    }

    fn enter(&self, token: Token) -> Result<()> {
        let mut stack = self.resolving.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = stack.iter().position(|t| *t == token) {
            let cycle = stack[position..]
                .iter()
                .chain(std::iter::once(&token))
                .map(|t| t.short_name())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(KeystoneError::CircularDependency { cycle });
        }
        stack.push(token);
        Ok(())
    }

    fn leave(&self, token: Token) {
        let mut stack = self.resolving.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = stack.iter().rposition(|t| *t == token) {
            stack.truncate(position);
        }
    }

    /// Construct every registered token that has not been built yet, in
    /// declaration order.
    pub fn resolve_all(&self) -> Result<()> {
        for token in &self.declared {
            self.resolve_token(*token)?;
        }
        Ok(())
    }

    /// Tokens in the order their instances finished construction.
    pub fn construction_order(&self) -> Vec<Token> {
        self.construction_order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Constructed instances with their hooks, in construction order.
    pub fn instances(&self) -> Vec<ResolvedInstance> {
        self.construction_order()
            .into_iter()
            .filter_map(|token| {
                let instance = Arc::clone(self.instances.get(&token)?.value());
                let hooks = self
                    .registrations
                    .get(&token)
                    .map(Provider::hooks)
                    .unwrap_or_default();
                Some(ResolvedInstance {
                    token,
                    instance,
                    hooks,
                })
            })
            .collect()
    }

    /// Whether `T` is part of the resolvable set.
    pub fn contains<T: 'static>(&self) -> bool {
        self.registrations.contains_key(&Token::of::<T>())
    }

    pub fn is_constructed(&self, token: Token) -> bool {
        self.instances.contains_key(&token)
    }

    /// Registered tokens, providers before controllers, in declaration order.
    pub fn registered(&self) -> &[Token] {
        &self.declared
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
