//! Method schema registry: merges per-plugin schema fragments into one document.
//!
//! A fragment has the shape `{ "components": { "schemas": {...}, "methods": {...} } }`.
//! `schemas` holds shared definitions referenced as `#/components/schemas/<Name>`;
//! `methods` maps a method name to its argument/return contract.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use veriforge_core::AgentError;

/// Name of the base definition describing validation failures.
pub const VALIDATION_ERROR_SCHEMA: &str = "ValidationError";

/// Owner recorded for the base definitions the registry is seeded with.
const BASE_OWNER: &str = "agent";

/// Declared contract for a single method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSchema {
    #[serde(default)]
    pub description: String,
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Value>,
}

impl MethodSchema {
    pub fn new(description: impl Into<String>, arguments: Value) -> Self {
        Self { description: description.into(), arguments, return_type: None }
    }

    pub fn returns(mut self, return_type: Value) -> Self {
        self.return_type = Some(return_type);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodSchema>,
}

/// The schema fragment a plugin declares for its methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginSchema {
    #[serde(default)]
    pub components: Components,
}

impl PluginSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a fragment written as JSON.
    pub fn from_value(value: Value) -> Result<Self, AgentError> {
        serde_json::from_value(value).map_err(|e| AgentError::InvalidSchema {
            location: "components".into(),
            message: e.to_string(),
        })
    }

    pub fn method(mut self, name: impl Into<String>, schema: MethodSchema) -> Self {
        self.components.methods.insert(name.into(), schema);
        self
    }

    pub fn shared(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.components.schemas.insert(name.into(), schema);
        self
    }
}

/// Merged schema of every registered plugin. Immutable once the agent is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub components: Components,
}

impl SchemaDocument {
    pub fn method(&self, name: &str) -> Option<&MethodSchema> {
        self.components.methods.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.components.methods.contains_key(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.components.methods.keys().map(String::as_str)
    }

    pub fn shared_schemas(&self) -> &BTreeMap<String, Value> {
        &self.components.schemas
    }
}

/// Collects fragments while the agent is being constructed.
pub struct SchemaRegistry {
    components: Components,
    owners: HashMap<String, String>,
    shared_owners: HashMap<String, String>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// A registry seeded with the base type definitions.
    pub fn new() -> Self {
        let mut components = Components::default();
        components
            .schemas
            .insert(VALIDATION_ERROR_SCHEMA.to_string(), validation_error_schema());
        let shared_owners =
            HashMap::from([(VALIDATION_ERROR_SCHEMA.to_string(), BASE_OWNER.to_string())]);
        Self { components, owners: HashMap::new(), shared_owners }
    }

    /// Merge one plugin's fragment. Two plugins describing the same method, or giving a
    /// shared definition different contents, is a configuration error. Identical shared
    /// definitions are accepted. Nothing is merged when the fragment is rejected.
    pub fn merge(&mut self, plugin: &str, fragment: PluginSchema) -> Result<(), AgentError> {
        for (name, schema) in &fragment.components.schemas {
            if let Some(existing) = self.components.schemas.get(name) {
                if existing != schema {
                    let first = self.shared_owners.get(name).map_or(BASE_OWNER, String::as_str);
                    return Err(AgentError::Config(format!(
                        "shared schema '{name}' from plugin '{plugin}' conflicts with the definition from '{first}'"
                    )));
                }
                debug!(plugin, schema = %name, "Shared schema declared again with identical contents");
            }
        }
        if let Some(name) = fragment.components.methods.keys().find(|m| self.owners.contains_key(*m)) {
            return Err(AgentError::DuplicateMethod {
                method: name.clone(),
                first: self.owners[name].clone(),
                second: plugin.to_string(),
            });
        }

        for (name, schema) in fragment.components.schemas {
            self.shared_owners.entry(name.clone()).or_insert_with(|| plugin.to_string());
            self.components.schemas.insert(name, schema);
        }

        for (name, schema) in fragment.components.methods {
            self.owners.insert(name.clone(), plugin.to_string());
            self.components.methods.insert(name, schema);
        }
        Ok(())
    }

    /// Which plugin declared the schema for `method`.
    pub fn owner(&self, method: &str) -> Option<&str> {
        self.owners.get(method).map(String::as_str)
    }

    /// Finish the document, keeping only methods the agent actually exposes.
    pub fn build(self, exposed: impl Fn(&str) -> bool) -> SchemaDocument {
        let mut components = self.components;
        components.methods.retain(|name, _| {
            let keep = exposed(name);
            if !keep {
                warn!(method = %name, "Schema declared for a method that is not exposed; dropping");
            }
            keep
        });
        SchemaDocument { components }
    }
}

fn validation_error_schema() -> Value {
    json!({
        "type": "object",
        "description": "Describes why a method call was rejected before or after invocation",
        "properties": {
            "message": { "type": "string" },
            "method": { "type": "string" },
            "code": { "type": "string" },
            "path": { "type": "string" },
            "description": { "type": "string" }
        },
        "required": ["message", "method", "code", "path", "description"]
    })
}
