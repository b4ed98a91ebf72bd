//! Schema-based structural validation.
//!
//! The JSON-Schema evaluator is a collaborator behind [`SchemaEngine`]. One
//! engine instance is shared by every verification pass, so any additional
//! schema a call needs for `$ref` resolution is registered through
//! [`ScopedSchemas`], which deregisters on drop. Registration therefore never
//! outlives the call that made it, error paths included.
//!
//! Layout:
//! - [`meta`]: contract meta-schema and the system-fields-only document schema
//! - [`enrich`]: injection of system fields into a contract's type schemas
//! - [`validator`]: contract and document validators built on the engine
//! - [`jsonschema_engine`]: default engine backed by the `jsonschema` crate

pub mod enrich;
#[cfg(feature = "jsonschema-engine")]
pub mod jsonschema_engine;
pub mod meta;
pub mod validator;

use serde_json::Value;

use crate::errors::DppResult;

pub use enrich::enrich_contract;
#[cfg(feature = "jsonschema-engine")]
pub use jsonschema_engine::JsonSchemaEngine;
pub use validator::{ContractValidator, DocumentValidator};

/// One schema-constraint violation as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    /// JSON pointer into the validated instance (`""` for the root).
    pub instance_path: String,
    /// Failing keyword, e.g. `required` or `additionalProperties`.
    pub keyword: String,
    /// Keyword parameters, e.g. `{"missingProperty": "$type"}`.
    pub params: Value,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(
        instance_path: impl Into<String>,
        keyword: impl Into<String>,
        params: Value,
        message: impl Into<String>,
    ) -> Self {
        Self {
            instance_path: instance_path.into(),
            keyword: keyword.into(),
            params,
            message: message.into(),
        }
    }
}

/// A reusable JSON-Schema evaluator.
///
/// Implementations must be safe to share between concurrent passes.
/// `add_schema`/`remove_schema` are reference counted per URI: a schema stays
/// resolvable until every registration of it has been removed.
pub trait SchemaEngine: Send + Sync {
    fn add_schema(&self, uri: &str, schema: Value) -> DppResult<()>;

    fn remove_schema(&self, uri: &str);

    /// Validate `instance` against `schema`, returning every violation.
    ///
    /// An uncompilable schema is reported as a violation at the root with
    /// keyword `schema`, so a submitter-authored schema cannot abort a pass.
    fn validate(&self, schema: &Value, instance: &Value) -> DppResult<Vec<SchemaViolation>>;
}

/// Registration guard for additional schemas.
pub struct ScopedSchemas<'a> {
    engine: &'a dyn SchemaEngine,
    uris: Vec<String>,
}

impl<'a> ScopedSchemas<'a> {
    /// Register every `(uri, schema)` pair. If one registration fails the
    /// ones already made are released before the error is returned.
    pub fn register<I>(engine: &'a dyn SchemaEngine, schemas: I) -> DppResult<Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut guard = Self {
            engine,
            uris: Vec::new(),
        };
        for (uri, schema) in schemas {
            engine.add_schema(&uri, schema)?;
            guard.uris.push(uri);
        }
        Ok(guard)
    }
}

impl Drop for ScopedSchemas<'_> {
    fn drop(&mut self) {
        for uri in self.uris.drain(..).rev() {
            self.engine.remove_schema(&uri);
        }
    }
}

/// Validate with `additional` schemas registered for the duration of the call.
pub fn validate_with(
    engine: &dyn SchemaEngine,
    schema: &Value,
    instance: &Value,
    additional: Vec<(String, Value)>,
) -> DppResult<Vec<SchemaViolation>> {
    let _scope = ScopedSchemas::register(engine, additional)?;
    engine.validate(schema, instance)
}
