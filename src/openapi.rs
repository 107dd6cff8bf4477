//! OpenAPI description of a compiled route table.

use crate::pipeline::{ApplicationOptions, CompiledRoute};
use crate::transport::axum_path;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Build an OpenAPI 3 document for `routes`.
///
/// Tags, security requirements and declared body/query schemas are taken
/// from the compiled routes; path parameters are listed as required strings.
pub fn document(routes: &[Arc<CompiledRoute>], options: &ApplicationOptions) -> Value {
    let mut paths = Map::new();

    for route in routes {
        let path = axum_path(&route.path);
        let operation = operation(route, &path);
        let entry = paths
            .entry(path)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(route.method.as_ref().to_ascii_lowercase(), operation);
        }
    }

    let mut document = json!({
        "openapi": "3.0.3",
        "info": {
            "title": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
    });

    if let Some(scheme) = &options.security_scheme {
        document["components"] = json!({
            "securitySchemes": {
                scheme.as_str(): { "type": "http", "scheme": "bearer" }
            }
        });
    }
    document
}

fn operation(route: &CompiledRoute, path: &str) -> Value {
    let mut parameters: Vec<Value> = path
        .split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| {
            json!({
                "name": name.trim_start_matches('*'),
                "in": "path",
                "required": true,
                "schema": { "type": "string" },
            })
        })
        .collect();

    if let Some(Value::Object(properties)) = route
        .query_schema
        .as_ref()
        .and_then(|schema| schema.schema().get("properties"))
    {
        parameters.extend(properties.iter().map(|(name, schema)| {
            json!({ "name": name, "in": "query", "schema": schema })
        }));
    }

    let mut operation = json!({
        "operationId": format!("{}_{}", route.controller, route.handler_name),
        "tags": route.api_tags,
        "parameters": parameters,
        "responses": { "default": { "description": "" } },
    });

    if let Some(schema) = &route.body_schema {
        operation["requestBody"] = json!({
            "content": { "application/json": { "schema": schema.schema() } }
        });
    }
    if !route.security.is_empty() {
        operation["security"] = Value::Array(
            route
                .security
                .iter()
                .map(|scheme| json!({ scheme.as_str(): [] }))
                .collect(),
        );
    }
    operation
}
