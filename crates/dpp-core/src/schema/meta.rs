//! Built-in schemas.
//!
//! - the contract meta-schema every contract is validated against
//! - the system-fields-only document schema (raw structure and deletes)
//! - the system-field definitions injected by enrichment

use serde_json::{json, Map, Value};

use crate::config::CoreConfig;
use crate::model::document::{
    PROPERTY_ACTION, PROPERTY_REVISION, PROPERTY_SCOPE, PROPERTY_SCOPE_ID, PROPERTY_TYPE,
    SYSTEM_PROPERTIES,
};

/// Name rule shared by document types and payload properties.
const FIELD_NAME_PATTERN: &str = "^[a-zA-Z0-9][a-zA-Z0-9_-]{0,62}$";

/// Definitions of the system fields, keyed by field name.
pub fn system_properties() -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        PROPERTY_TYPE.to_string(),
        json!({ "type": "string", "minLength": 1 }),
    );
    props.insert(
        PROPERTY_SCOPE.to_string(),
        json!({ "type": "string", "pattern": "^[0-9a-f]{64}$" }),
    );
    props.insert(
        PROPERTY_SCOPE_ID.to_string(),
        json!({
            "type": "string",
            "minLength": 34,
            "maxLength": 34,
            "pattern": "^[1-9A-HJ-NP-Za-km-z]+$"
        }),
    );
    props.insert(
        PROPERTY_REVISION.to_string(),
        json!({ "type": "integer", "minimum": 0 }),
    );
    props.insert(
        PROPERTY_ACTION.to_string(),
        json!({ "type": "integer", "enum": [1, 2, 3] }),
    );
    props
}

/// Schema of a document with system fields only; payload is left open.
pub fn document_base_schema() -> Value {
    json!({
        "type": "object",
        "properties": system_properties(),
        "required": SYSTEM_PROPERTIES,
    })
}

/// Meta-schema for contracts under `cfg`.
pub fn contract_meta_schema(cfg: &CoreConfig) -> Value {
    let index_property = json!({
        "type": "object",
        "minProperties": 1,
        "maxProperties": 1,
        "additionalProperties": { "type": "string", "enum": ["asc", "desc"] }
    });

    let index = json!({
        "type": "object",
        "properties": {
            "properties": {
                "type": "array",
                "minItems": 1,
                "maxItems": 100,
                "items": index_property
            },
            "unique": { "type": "boolean", "const": true }
        },
        "required": ["properties"],
        "additionalProperties": false
    });

    let document_schema = json!({
        "type": "object",
        "properties": {
            "type": { "const": "object" },
            "properties": {
                "type": "object",
                "minProperties": 1,
                "maxProperties": 100,
                "propertyNames": { "pattern": FIELD_NAME_PATTERN },
                "additionalProperties": { "type": "object" }
            },
            "required": {
                "type": "array",
                "items": { "type": "string" }
            },
            "additionalProperties": { "const": false },
            "indices": {
                "type": "array",
                "minItems": 1,
                "maxItems": cfg.limits.max_indices_per_type,
                "items": index
            }
        },
        "required": ["properties", "additionalProperties"]
    });

    json!({
        "type": "object",
        "properties": {
            "$schema": { "type": "string", "const": cfg.validation.meta_schema.as_uri() },
            "name": { "type": "string", "minLength": 3, "maxLength": 24 },
            "version": { "type": "integer", "minimum": 1 },
            "definitions": {
                "type": "object",
                "minProperties": 1,
                "maxProperties": 100,
                "propertyNames": { "pattern": FIELD_NAME_PATTERN },
                "additionalProperties": { "type": "object" }
            },
            "documents": {
                "type": "object",
                "minProperties": 1,
                "maxProperties": cfg.limits.max_document_types,
                "propertyNames": { "pattern": FIELD_NAME_PATTERN },
                "additionalProperties": document_schema
            }
        },
        "required": ["$schema", "name", "version", "documents"],
        "additionalProperties": false
    })
}
