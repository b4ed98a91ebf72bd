//! Contract enrichment.
//!
//! Document schemas are authored without system fields. Before validating a
//! document, the contract's JSON form is deep-copied and every type schema
//! gains the system-field definitions in `properties` and their names in
//! `required`. The copy drops the contract's `$schema` reference: it is used
//! only as an additional schema for `$ref` resolution, never as a contract.

use serde_json::Value;

use crate::errors::{DppError, DppResult};
use crate::model::contract::Contract;
use crate::model::document::SYSTEM_PROPERTIES;

/// Return an enriched deep copy of `contract`'s JSON form.
pub fn enrich_contract(contract: &Contract) -> DppResult<Value> {
    let mut raw = contract.to_json()?;
    let obj = raw
        .as_object_mut()
        .ok_or_else(|| DppError::invariant("contract must serialize to an object"))?;

    obj.remove("$schema");

    let documents = obj
        .get_mut("documents")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| DppError::invariant("contract documents must be an object"))?;

    for (doc_type, schema) in documents.iter_mut() {
        enrich_document_schema(schema).map_err(|e| {
            DppError::invalid_argument(format!("cannot enrich document type {doc_type:?}: {e}"))
        })?;
    }

    Ok(raw)
}

fn enrich_document_schema(schema: &mut Value) -> DppResult<()> {
    let obj = schema
        .as_object_mut()
        .ok_or_else(|| DppError::invalid_argument("document schema must be an object"))?;

    let props = obj
        .entry("properties")
        .or_insert_with(|| Value::Object(Default::default()))
        .as_object_mut()
        .ok_or_else(|| DppError::invalid_argument("properties must be an object"))?;
    for (name, definition) in super::meta::system_properties() {
        props.insert(name, definition);
    }

    let required = obj
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| DppError::invalid_argument("required must be an array"))?;
    for name in SYSTEM_PROPERTIES {
        if !required.iter().any(|r| r.as_str() == Some(name)) {
            required.push(Value::String(name.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::CONTRACT_META_SCHEMA_URI_V1;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn contract() -> Contract {
        let mut docs = BTreeMap::new();
        docs.insert(
            "person".to_string(),
            json!({
                "properties": {"lastName": {"type": "string"}},
                "required": ["lastName"],
                "additionalProperties": false
            }),
        );
        Contract::new(CONTRACT_META_SCHEMA_URI_V1, "people", docs)
    }

    #[test]
    fn system_fields_are_injected() {
        let enriched = enrich_contract(&contract()).unwrap();
        let person = &enriched["documents"]["person"];
        for name in SYSTEM_PROPERTIES {
            assert!(person["properties"].get(name).is_some());
        }
        let required = person["required"].as_array().unwrap();
        assert_eq!(required[0], json!("lastName"));
        assert_eq!(required.len(), 1 + SYSTEM_PROPERTIES.len());
    }

    #[test]
    fn meta_reference_is_stripped() {
        let enriched = enrich_contract(&contract()).unwrap();
        assert!(enriched.get("$schema").is_none());
    }

    #[test]
    fn caller_contract_is_untouched() {
        let c = contract();
        let before = c.clone();
        let _ = enrich_contract(&c).unwrap();
        assert_eq!(c, before);
        assert!(c.document_schema("person").unwrap()["properties"]
            .get("$type")
            .is_none());
    }

    #[test]
    fn enrichment_is_idempotent_on_required() {
        let mut c = contract();
        c.set_document_schema(
            "person",
            json!({"properties": {"a": {}}, "required": ["$type"], "additionalProperties": false}),
        );
        let enriched = enrich_contract(&c).unwrap();
        let required = enriched["documents"]["person"]["required"].as_array().unwrap();
        assert_eq!(required.len(), SYSTEM_PROPERTIES.len());
    }
}
