use crate::context::RequestContext;
use crate::exception::{Exception, HttpException};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use strum_macros::Display;

/// Where a handler argument is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ParamSource {
    Body,
    Param,
    Query,
    Headers,
    CurrentUser,
    Cookie,
}

/// Binding of one positional handler argument to a request source.
///
/// Without a key, map-like sources deliver the whole map.
#[derive(Debug, Clone)]
pub struct ParamBinding {
    pub index: usize,
    pub source: ParamSource,
    pub key: Option<String>,
    /// JSON Schema the transport validates against before the handler runs
    pub schema: Option<Arc<Value>>,
}

impl ParamBinding {
    pub fn new(index: usize, source: ParamSource) -> Self {
        Self {
            index,
            source,
            key: None,
            schema: None,
        }
    }

    pub fn body(index: usize) -> Self {
        Self::new(index, ParamSource::Body)
    }

    pub fn param(index: usize, key: impl Into<String>) -> Self {
        Self::new(index, ParamSource::Param).with_key(key)
    }

    pub fn params(index: usize) -> Self {
        Self::new(index, ParamSource::Param)
    }

    pub fn query(index: usize, key: impl Into<String>) -> Self {
        Self::new(index, ParamSource::Query).with_key(key)
    }

    pub fn query_map(index: usize) -> Self {
        Self::new(index, ParamSource::Query)
    }

    pub fn header(index: usize, key: impl Into<String>) -> Self {
        Self::new(index, ParamSource::Headers).with_key(key)
    }

    pub fn headers(index: usize) -> Self {
        Self::new(index, ParamSource::Headers)
    }

    pub fn current_user(index: usize) -> Self {
        Self::new(index, ParamSource::CurrentUser)
    }

    pub fn cookie(index: usize, key: impl Into<String>) -> Self {
        Self::new(index, ParamSource::Cookie).with_key(key)
    }

    pub fn cookies(index: usize) -> Self {
        Self::new(index, ParamSource::Cookie)
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    fn read(&self, ctx: &RequestContext) -> Value {
        let key = self.key.as_deref();
        match self.source {
            ParamSource::Body => ctx.body.clone(),
            ParamSource::Param => lookup(&ctx.params, key),
            ParamSource::Query => lookup(&ctx.query, key),
            ParamSource::Headers => {
                let headers = ctx.headers_json();
                match key {
                    Some(key) => headers
                        .get(key.to_ascii_lowercase())
                        .cloned()
                        .unwrap_or(Value::Null),
                    None => headers,
                }
            }
            ParamSource::CurrentUser => ctx.user.clone().map(Value::String).unwrap_or(Value::Null),
            ParamSource::Cookie => lookup(&ctx.cookies, key),
        }
    }
}

fn lookup(map: &std::collections::HashMap<String, String>, key: Option<&str>) -> Value {
    match key {
        Some(key) => map.get(key).cloned().map(Value::String).unwrap_or(Value::Null),
        None => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<_, _>>(),
        ),
    }
}

/// Positional handler arguments read from a request.
#[derive(Debug, Default)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Deserialize the argument at `index`, leaving `null` in its place.
    ///
    /// A missing argument reads as `null`, so `Option<T>` receives `None`.
    /// String values that do not fit the target type are retried as JSON, so
    /// a query value `"2"` can bind to an integer.
    pub fn take<T: DeserializeOwned>(&mut self, index: usize) -> Result<T, Exception> {
        let value = self
            .values
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or(Value::Null);

        match T::deserialize(&value) {
            Ok(bound) => Ok(bound),
            Err(err) => {
                if let Value::String(raw) = &value {
                    if let Ok(bound) = serde_json::from_str::<T>(raw) {
                        return Ok(bound);
                    }
                }
                Err(Box::new(HttpException::bad_request(format!(
                    "Invalid argument at position {index}: {err}"
                ))))
            }
        }
    }
}

/// Build the argument array for `bindings`.
///
/// The array is sized to the highest bound index + 1; unbound positions hold
/// `null`.
pub fn extract_arguments(ctx: &RequestContext, bindings: &[ParamBinding]) -> Arguments {
    let Some(len) = bindings.iter().map(|b| b.index + 1).max() else {
        return Arguments::default();
    };
    let mut values = vec![Value::Null; len];
    for binding in bindings {
        values[binding.index] = binding.read(ctx);
    }
    Arguments::new(values)
}
