//! Declarative metadata attached to controllers, handler methods and modules.
//!
//! The registry is plain storage: writers record facts once at composition
//! time and readers (the module graph, the pipeline compiler) look them up
//! later by subject and key. Nothing is validated here; a missing entry or an
//! entry of an unexpected type simply reads as absent.

mod keys;

pub use keys::*;

use crate::di::Token;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// What a piece of metadata is attached to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// A module, controller or other component type
    Class(Token),
    /// A handler method, identified by its owner and method name
    Method(Token, &'static str),
}

impl Subject {
    pub fn class<T: 'static>() -> Self {
        Self::Class(Token::of::<T>())
    }

    pub fn method<T: 'static>(name: &'static str) -> Self {
        Self::Method(Token::of::<T>(), name)
    }

    pub fn token(&self) -> Token {
        match self {
            Self::Class(token) | Self::Method(token, _) => *token,
        }
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(token) => write!(f, "{}", token),
            Self::Method(token, name) => write!(f, "{}::{}", token, name),
        }
    }
}

/// Key for a single value; writes are last-wins.
pub struct MetadataKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MetadataKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Key for an accumulating list; writes append.
pub struct ListKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ListKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

type Entry = Box<dyn Any + Send + Sync>;

/// Per-application metadata store keyed by `(subject, key)`.
#[derive(Default)]
pub struct MetadataRegistry {
    entries: HashMap<(Subject, &'static str), Entry>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<T: Send + Sync + 'static>(&mut self, subject: Subject, key: &MetadataKey<T>, value: T) {
        self.entries.insert((subject, key.name), Box::new(value));
    }

    pub fn get<T: 'static>(&self, subject: Subject, key: &MetadataKey<T>) -> Option<&T> {
        self.entries
            .get(&(subject, key.name))
            .and_then(|entry| entry.downcast_ref::<T>())
    }

    pub fn get_or_default<T: Clone + Default + 'static>(&self, subject: Subject, key: &MetadataKey<T>) -> T {
        self.get(subject, key).cloned().unwrap_or_default()
    }

    pub fn append<T: Send + Sync + 'static>(&mut self, subject: Subject, key: &ListKey<T>, value: T) {
        let entry = self
            .entries
            .entry((subject, key.name))
            .or_insert_with(|| Box::new(Vec::<T>::new()));
        match entry.downcast_mut::<Vec<T>>() {
            Some(list) => list.push(value),
            None => *entry = Box::new(vec![value]),
        }
    }

    pub fn extend<T: Send + Sync + 'static>(
        &mut self,
        subject: Subject,
        key: &ListKey<T>,
        values: impl IntoIterator<Item = T>,
    ) {
        for value in values {
            self.append(subject, key, value);
        }
    }

    pub fn list<T: 'static>(&self, subject: Subject, key: &ListKey<T>) -> &[T] {
        self.entries
            .get(&(subject, key.name))
            .and_then(|entry| entry.downcast_ref::<Vec<T>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, subject: Subject, key_name: &'static str) -> bool {
        self.entries.contains_key(&(subject, key_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
