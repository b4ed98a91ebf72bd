//! [`SchemaEngine`] backed by the `jsonschema` crate.
//!
//! Additional schemas live in a reference-counted registry keyed by URI.
//! A schema of the form `{"$ref": "<registered-uri>#<pointer>"}` is resolved
//! against the registry by validating with the registered document as root
//! and a local `$ref` to `#<pointer>`, so `#/definitions/...` references
//! inside the registered document keep working.

use std::collections::BTreeMap;

use jsonschema::error::ValidationErrorKind;
use parking_lot::RwLock;
use serde_json::{json, Value};

use super::{SchemaEngine, SchemaViolation};
use crate::errors::{DppError, DppResult};

#[derive(Debug)]
struct Registered {
    schema: Value,
    refs: usize,
}

#[derive(Debug, Default)]
pub struct JsonSchemaEngine {
    registry: RwLock<BTreeMap<String, Registered>>,
}

impl JsonSchemaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct URIs currently registered.
    pub fn registered(&self) -> usize {
        self.registry.read().len()
    }

    /// Resolve a top-level reference into a registered document.
    fn resolve(&self, schema: &Value) -> DppResult<Value> {
        let target = match schema.as_object() {
            Some(obj) if obj.len() == 1 => obj.get("$ref").and_then(Value::as_str),
            _ => None,
        };
        let Some(target) = target else {
            return Ok(schema.clone());
        };

        let (base, fragment) = target.split_once('#').unwrap_or((target, ""));
        let registry = self.registry.read();
        let Some(entry) = registry.get(base) else {
            return Ok(schema.clone());
        };

        let mut root = entry.schema.clone();
        let obj = root.as_object_mut().ok_or_else(|| {
            DppError::schema_engine(format!("registered schema {base} is not an object"))
        })?;
        obj.insert("$ref".to_string(), Value::String(format!("#{fragment}")));
        Ok(root)
    }
}

impl SchemaEngine for JsonSchemaEngine {
    fn add_schema(&self, uri: &str, schema: Value) -> DppResult<()> {
        if !schema.is_object() {
            return Err(DppError::schema_engine(format!(
                "schema registered under {uri} must be an object"
            )));
        }
        let mut registry = self.registry.write();
        match registry.get_mut(uri) {
            Some(entry) if entry.schema == schema => entry.refs += 1,
            Some(_) => {
                return Err(DppError::schema_engine(format!(
                    "a different schema is already registered under {uri}"
                )))
            }
            None => {
                registry.insert(uri.to_string(), Registered { schema, refs: 1 });
            }
        }
        Ok(())
    }

    fn remove_schema(&self, uri: &str) {
        let mut registry = self.registry.write();
        if let Some(entry) = registry.get_mut(uri) {
            entry.refs -= 1;
            if entry.refs == 0 {
                registry.remove(uri);
            }
        }
    }

    fn validate(&self, schema: &Value, instance: &Value) -> DppResult<Vec<SchemaViolation>> {
        let root = self.resolve(schema)?;

        let validator = match jsonschema::options().build(&root) {
            Ok(v) => v,
            Err(e) => {
                let message = e.to_string();
                return Ok(vec![SchemaViolation::new(
                    "",
                    "schema",
                    json!({ "error": message }),
                    message,
                )]);
            }
        };

        let violations = validator
            .iter_errors(instance)
            .map(|error| {
                let (keyword, params) = describe(&error.kind);
                SchemaViolation::new(
                    error.instance_path.to_string(),
                    keyword,
                    params,
                    error.to_string(),
                )
            })
            .collect();

        Ok(violations)
    }
}

/// Keyword name and parameters for an engine error kind.
fn describe(kind: &ValidationErrorKind) -> (&'static str, Value) {
    match kind {
        ValidationErrorKind::Required { property } => {
            ("required", json!({ "missingProperty": property }))
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            ("additionalProperties", json!({ "additionalProperties": unexpected }))
        }
        ValidationErrorKind::Type { .. } => ("type", Value::Null),
        ValidationErrorKind::Enum { .. } => ("enum", Value::Null),
        ValidationErrorKind::Constant { .. } => ("const", Value::Null),
        ValidationErrorKind::Pattern { .. } => ("pattern", Value::Null),
        ValidationErrorKind::MinLength { .. } => ("minLength", Value::Null),
        ValidationErrorKind::MaxLength { .. } => ("maxLength", Value::Null),
        ValidationErrorKind::Minimum { .. } => ("minimum", Value::Null),
        ValidationErrorKind::Maximum { .. } => ("maximum", Value::Null),
        ValidationErrorKind::MinItems { .. } => ("minItems", Value::Null),
        ValidationErrorKind::MaxItems { .. } => ("maxItems", Value::Null),
        ValidationErrorKind::MinProperties { .. } => ("minProperties", Value::Null),
        ValidationErrorKind::MaxProperties { .. } => ("maxProperties", Value::Null),
        ValidationErrorKind::PropertyNames { .. } => ("propertyNames", Value::Null),
        _ => ("schema", Value::Null),
    }
}
