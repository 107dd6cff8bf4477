//! JSON Schema validation of request bodies and query maps.

use crate::error::{KeystoneError, Result};
use crate::exception::HttpException;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A compiled JSON Schema.
#[derive(Clone)]
pub struct ValidationSchema {
    schema: Arc<Value>,
    validator: Arc<jsonschema::Validator>,
}

impl ValidationSchema {
    /// Compile `schema`; an invalid schema is a startup error.
    pub fn compile(schema: Arc<Value>) -> Result<Self> {
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| KeystoneError::Internal(format!("Invalid validation schema: {e}")))?;
        Ok(Self {
            schema,
            validator: Arc::new(validator),
        })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate `instance`, collecting every violation message
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validate and map failures to a 422 carrying the messages under `data`
    pub fn check(&self, instance: &Value) -> std::result::Result<(), HttpException> {
        self.validate(instance).map_err(|errors| {
            HttpException::unprocessable_entity("Validation error").with_response(Value::from(errors))
        })
    }
}

impl fmt::Debug for ValidationSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}
