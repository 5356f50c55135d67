//! Validation engine.
//!
//! Validators are compiled once per method from the immutable [`SchemaDocument`]; every
//! compiled schema carries the document's shared definitions so `#/components/schemas/...`
//! references resolve. Every schema is compiled as draft-07, the same draft fragments are
//! checked against, so draft-07-only forms such as tuple `items` keep their meaning.
//! Only the first violation is reported.

use std::collections::{BTreeMap, HashMap};

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use tracing::debug;
use veriforge_core::{AgentError, ValidationError};

use crate::registry::SchemaDocument;

const DRAFT7_META_SCHEMA: &str = "http://json-schema.org/draft-07/schema#";

static DRAFT7_META: Lazy<Result<Validator, String>> = Lazy::new(|| {
    jsonschema::draft7::new(&json!({ "$ref": DRAFT7_META_SCHEMA })).map_err(|e| e.to_string())
});

/// Compiled argument and return-type validators, keyed by method name.
#[derive(Default)]
pub struct SchemaValidators {
    arguments: HashMap<String, Validator>,
    returns: HashMap<String, Validator>,
}

impl SchemaValidators {
    /// Compile every method contract in the document. Any fragment that is not a valid
    /// draft-07 schema fails the whole compilation.
    pub fn compile(document: &SchemaDocument) -> Result<Self, AgentError> {
        let shared = document.shared_schemas();
        let mut validators = Self::default();

        for (name, method) in &document.components.methods {
            let location = format!("components.methods.{name}.arguments");
            check_meta_schema(&method.arguments, &location)?;
            validators
                .arguments
                .insert(name.clone(), compile(&method.arguments, shared, &location)?);

            if let Some(return_type) = &method.return_type {
                let location = format!("components.methods.{name}.returnType");
                check_meta_schema(return_type, &location)?;
                validators
                    .returns
                    .insert(name.clone(), compile(return_type, shared, &location)?);
            }
        }

        debug!(
            arguments = validators.arguments.len(),
            returns = validators.returns.len(),
            "Compiled method validators"
        );
        Ok(validators)
    }

    pub fn has_arguments(&self, method: &str) -> bool {
        self.arguments.contains_key(method)
    }

    pub fn has_return_type(&self, method: &str) -> bool {
        self.returns.contains_key(method)
    }

    /// Methods without a declared arguments schema always pass.
    pub fn validate_arguments(&self, method: &str, args: &Value) -> Result<(), ValidationError> {
        match self.arguments.get(method) {
            Some(validator) => first_violation(
                validator,
                args,
                method,
                &format!("components.methods.{method}.arguments"),
            ),
            None => Ok(()),
        }
    }

    /// Methods without a declared return type always pass.
    pub fn validate_return(&self, method: &str, value: &Value) -> Result<(), ValidationError> {
        match self.returns.get(method) {
            Some(validator) => first_violation(
                validator,
                value,
                method,
                &format!("components.methods.{method}.returnType"),
            ),
            None => Ok(()),
        }
    }
}

/// One-off validation of `value` against `schema`, reporting the first violation.
pub fn validate(value: &Value, schema: &Value, method: &str, path: &str) -> Result<(), AgentError> {
    let validator = compile(schema, &BTreeMap::new(), path)?;
    first_violation(&validator, value, method, path).map_err(AgentError::Validation)
}

/// Check a schema fragment against the draft-07 meta-schema.
pub fn check_meta_schema(schema: &Value, location: &str) -> Result<(), AgentError> {
    let meta = DRAFT7_META.as_ref().map_err(|e| AgentError::InvalidSchema {
        location: DRAFT7_META_SCHEMA.into(),
        message: e.clone(),
    })?;
    match meta.iter_errors(schema).next() {
        Some(error) => Err(AgentError::InvalidSchema {
            location: location.into(),
            message: error.to_string(),
        }),
        None => Ok(()),
    }
}

fn compile(
    schema: &Value,
    shared: &BTreeMap<String, Value>,
    location: &str,
) -> Result<Validator, AgentError> {
    let root = match schema {
        Value::Object(map) if !shared.is_empty() && !map.contains_key("components") => {
            let mut map = map.clone();
            map.insert("components".into(), json!({ "schemas": shared }));
            Value::Object(map)
        }
        other => other.clone(),
    };
    jsonschema::draft7::new(&root).map_err(|e| AgentError::InvalidSchema {
        location: location.into(),
        message: e.to_string(),
    })
}

fn first_violation(
    validator: &Validator,
    value: &Value,
    method: &str,
    hint: &str,
) -> Result<(), ValidationError> {
    let Some(error) = validator.iter_errors(value).next() else {
        return Ok(());
    };
    let schema_path = error.schema_path.to_string();
    let code = schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("schema")
        .to_string();
    let instance_path = error.instance_path.to_string();
    Err(ValidationError {
        message: error.to_string(),
        method: method.to_string(),
        code,
        path: if instance_path.is_empty() { "/".into() } else { instance_path },
        description: format!("{hint}{schema_path}"),
    })
}
