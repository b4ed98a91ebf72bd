//! Contract model.
//!
//! A contract names the document types an owner may submit and the JSON
//! schema each type's payload must satisfy. Its id is content-derived:
//! `id = H(canonical(contract))`, so it is recomputed rather than stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{DppError, DppResult};
use crate::model::index::IndexDefinition;

/// URI scheme under which contracts are registered with the schema engine.
pub const CONTRACT_SCHEMA_URI_PREFIX: &str = "dpp://contract/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(rename = "$schema")]
    meta_schema: String,
    name: String,
    version: u32,
    documents: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    definitions: BTreeMap<String, Value>,
}

impl Contract {
    pub fn new(
        meta_schema: impl Into<String>,
        name: impl Into<String>,
        documents: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            meta_schema: meta_schema.into(),
            name: name.into(),
            version: 1,
            documents,
            definitions: BTreeMap::new(),
        }
    }

    /// Decode a contract from its keyed JSON form.
    pub fn from_json(raw: Value) -> DppResult<Self> {
        serde_json::from_value(raw)
            .map_err(|e| DppError::serialization(format!("invalid contract: {e}")))
    }

    pub fn to_json(&self) -> DppResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Canonical CBOR bytes, subject to the encoding ceiling.
    pub fn encode(&self) -> DppResult<Vec<u8>> {
        crate::canonical::encode_with_limit(&self.to_json()?, crate::canonical::MAX_ENCODED_BYTES)
    }

    pub fn decode(bytes: &[u8]) -> DppResult<Self> {
        Self::from_json(crate::canonical::decode(bytes)?)
    }

    /// Content-derived identifier.
    pub fn id(&self) -> DppResult<String> {
        crate::hash::hash_canonical_limited_hex(
            &self.to_json()?,
            crate::canonical::MAX_ENCODED_BYTES,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn set_version(&mut self, version: u32) -> &mut Self {
        self.version = version;
        self
    }

    pub fn meta_schema(&self) -> &str {
        &self.meta_schema
    }

    pub fn set_meta_schema(&mut self, uri: impl Into<String>) -> &mut Self {
        self.meta_schema = uri.into();
        self
    }

    pub fn documents(&self) -> &BTreeMap<String, Value> {
        &self.documents
    }

    pub fn set_documents(&mut self, documents: BTreeMap<String, Value>) -> &mut Self {
        self.documents = documents;
        self
    }

    pub fn is_document_defined(&self, doc_type: &str) -> bool {
        self.documents.contains_key(doc_type)
    }

    pub fn document_schema(&self, doc_type: &str) -> DppResult<&Value> {
        self.documents
            .get(doc_type)
            .ok_or_else(|| DppError::UndefinedDocumentType(doc_type.to_string()))
    }

    pub fn set_document_schema(&mut self, doc_type: impl Into<String>, schema: Value) -> &mut Self {
        self.documents.insert(doc_type.into(), schema);
        self
    }

    pub fn definitions(&self) -> &BTreeMap<String, Value> {
        &self.definitions
    }

    pub fn set_definitions(&mut self, definitions: BTreeMap<String, Value>) -> &mut Self {
        self.definitions = definitions;
        self
    }

    /// URI under which the (enriched) contract is registered for `$ref` resolution.
    pub fn schema_uri(&self) -> DppResult<String> {
        Ok(format!("{CONTRACT_SCHEMA_URI_PREFIX}{}", self.id()?))
    }

    /// A schema that points at one document type inside the registered contract.
    pub fn document_schema_ref(&self, doc_type: &str) -> DppResult<Value> {
        if !self.is_document_defined(doc_type) {
            return Err(DppError::UndefinedDocumentType(doc_type.to_string()));
        }
        Ok(json!({ "$ref": format!("{}#/documents/{doc_type}", self.schema_uri()?) }))
    }

    /// All indices declared by a document type.
    pub fn indices(&self, doc_type: &str) -> DppResult<Vec<IndexDefinition>> {
        match self.document_schema(doc_type)?.get("indices") {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(IndexDefinition::from_json).collect(),
            Some(_) => Err(DppError::invalid_argument(format!(
                "indices of {doc_type} must be an array"
            ))),
        }
    }

    /// Indices marked unique.
    pub fn unique_indices(&self, doc_type: &str) -> DppResult<Vec<IndexDefinition>> {
        Ok(self
            .indices(doc_type)?
            .into_iter()
            .filter(|i| i.unique)
            .collect())
    }
}
