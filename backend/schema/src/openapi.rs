//! OpenAPI description generated from the merged schema document.
//!
//! Every exposed method becomes `POST /<method>`: the request body is the arguments schema,
//! `200` carries the return type and `400` the `ValidationError` shape.

use serde_json::{Map, Value, json};

use crate::registry::{SchemaDocument, VALIDATION_ERROR_SCHEMA};

/// Title and version printed in the `info` block.
#[derive(Debug, Clone)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self { title: "Veriforge agent".into(), version: env!("CARGO_PKG_VERSION").into() }
    }
}

/// Build the description for `methods`. Methods without a declared contract get a generic
/// object body and an unconstrained response.
pub fn build(document: &SchemaDocument, info: &ApiInfo, methods: &[String]) -> Value {
    let mut paths = Map::new();
    for method in methods {
        let contract = document.method(method);
        let description = contract.map(|c| c.description.clone()).unwrap_or_default();
        let request = contract
            .map(|c| c.arguments.clone())
            .unwrap_or_else(|| json!({ "type": "object" }));
        let response = contract
            .and_then(|c| c.return_type.clone())
            .unwrap_or_else(|| json!({}));

        paths.insert(
            format!("/{method}"),
            json!({
                "post": {
                    "operationId": method,
                    "description": description,
                    "requestBody": {
                        "content": { "application/json": { "schema": request } }
                    },
                    "responses": {
                        "200": {
                            "description": "Successful response",
                            "content": { "application/json": { "schema": response } }
                        },
                        "400": {
                            "description": "Validation error",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": format!("#/components/schemas/{VALIDATION_ERROR_SCHEMA}")
                                    }
                                }
                            }
                        }
                    }
                }
            }),
        );
    }

    json!({
        "openapi": "3.0.0",
        "info": { "title": info.title, "version": info.version },
        "components": { "schemas": document.shared_schemas() },
        "paths": paths,
    })
}
