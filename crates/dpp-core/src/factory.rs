//! Factories for contracts, documents and packets.
//!
//! Factories bind the context a model cannot carry itself: the meta-schema a
//! new contract declares, or the owner identity and contract a document is
//! scoped to. Objects created from external input are validated unless the
//! caller opts out; invalid input fails with [`DppError::InvalidObject`]
//! carrying every finding.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::errors::{DppError, DppResult};
use crate::model::contract::Contract;
use crate::model::document::{compute_scope, Document};
use crate::model::packet::Packet;
use crate::schema::{ContractValidator, DocumentValidator};
use crate::version::MetaSchemaVersion;

/// Options for `create_from_*` constructors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromObjectOptions {
    /// Decode without structural validation (trusted, already-persisted input).
    pub skip_validation: bool,
}

#[derive(Clone)]
pub struct ContractFactory {
    validator: ContractValidator,
    meta_schema: MetaSchemaVersion,
}

impl ContractFactory {
    pub fn new(validator: ContractValidator, meta_schema: MetaSchemaVersion) -> Self {
        Self {
            validator,
            meta_schema,
        }
    }

    /// A new contract at version 1.
    pub fn create(&self, name: impl Into<String>, documents: BTreeMap<String, Value>) -> Contract {
        Contract::new(self.meta_schema.as_uri(), name, documents)
    }

    pub fn create_from_object(&self, raw: Value, opts: FromObjectOptions) -> DppResult<Contract> {
        if !opts.skip_validation {
            let result = self.validator.validate_raw(&raw)?;
            if !result.is_valid() {
                return Err(DppError::InvalidObject {
                    kind: "contract",
                    findings: result.into_findings(),
                });
            }
        }
        Contract::from_json(raw)
    }

    pub fn create_from_bytes(&self, bytes: &[u8], opts: FromObjectOptions) -> DppResult<Contract> {
        self.create_from_object(crate::canonical::decode(bytes)?, opts)
    }
}

/// Creates documents owned by `user_id` under one contract.
#[derive(Clone)]
pub struct DocumentFactory {
    user_id: String,
    contract: Contract,
    contract_id: String,
    validator: DocumentValidator,
}

impl DocumentFactory {
    pub fn new(
        user_id: impl Into<String>,
        contract: Contract,
        validator: DocumentValidator,
    ) -> DppResult<Self> {
        Ok(Self {
            user_id: user_id.into(),
            contract_id: contract.id()?,
            contract,
            validator,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// A new document with a fresh scope id, revision 0 and action CREATE.
    pub fn create(&self, doc_type: &str, payload: Map<String, Value>) -> DppResult<Document> {
        if !self.contract.is_document_defined(doc_type) {
            return Err(DppError::UndefinedDocumentType(doc_type.to_string()));
        }
        let mut document = Document::new(
            doc_type,
            compute_scope(&self.contract_id, &self.user_id),
            crate::entropy::generate(),
            self.user_id.clone(),
        );
        document.set_payload(payload);
        Ok(document)
    }

    pub fn create_from_object(&self, raw: &Value, opts: FromObjectOptions) -> DppResult<Document> {
        if !opts.skip_validation {
            let result = self.validator.validate_raw(raw, &self.contract)?;
            if !result.is_valid() {
                return Err(DppError::InvalidObject {
                    kind: "document",
                    findings: result.into_findings(),
                });
            }
        }
        Document::from_json(raw, self.user_id.clone())
    }

    pub fn create_from_bytes(&self, bytes: &[u8], opts: FromObjectOptions) -> DppResult<Document> {
        self.create_from_object(&crate::canonical::decode(bytes)?, opts)
    }
}

/// Creates packets. Packet contents are checked by the verifier, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketFactory;

impl PacketFactory {
    pub fn create_with_contract(&self, contract: Contract) -> DppResult<Packet> {
        Packet::with_contract(contract)
    }

    pub fn create_with_documents(&self, contract_id: &str, documents: Vec<Document>) -> Packet {
        Packet::with_documents(contract_id, documents)
    }

    pub fn create_from_object(&self, raw: &Value, user_id: &str) -> DppResult<Packet> {
        Packet::from_json(raw, user_id)
    }

    pub fn create_from_bytes(&self, bytes: &[u8], user_id: &str) -> DppResult<Packet> {
        Packet::decode(bytes, user_id)
    }
}

#[cfg(all(test, feature = "jsonschema-engine"))]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::model::document::Action;
    use crate::schema::{JsonSchemaEngine, SchemaEngine};
    use crate::test_support::people_contract;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Arc;

    fn engine() -> Arc<dyn SchemaEngine> {
        Arc::new(JsonSchemaEngine::new())
    }

    fn document_factory() -> DocumentFactory {
        DocumentFactory::new("alice", people_contract(), DocumentValidator::new(engine())).unwrap()
    }

    #[test]
    fn created_document_is_scoped_to_owner_and_contract() {
        let f = document_factory();
        let mut payload = Map::new();
        payload.insert("lastName".into(), json!("Birkin"));
        let d = f.create("person", payload).unwrap();

        assert_eq!(d.action(), Action::Create);
        assert_eq!(d.revision(), 0);
        assert_eq!(d.user_id(), "alice");
        assert_eq!(d.scope(), compute_scope(&people_contract().id().unwrap(), "alice"));
        assert!(crate::entropy::validate(d.scope_id()));
    }

    #[test]
    fn fresh_scope_ids_give_fresh_ids() {
        let f = document_factory();
        let a = f.create("note", Map::new()).unwrap();
        let b = f.create("note", Map::new()).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn undefined_type_is_rejected() {
        let f = document_factory();
        assert_matches!(f.create("ghost", Map::new()), Err(DppError::UndefinedDocumentType(t)) if t == "ghost");
    }

    #[test]
    fn invalid_document_object_carries_findings() {
        let f = document_factory();
        let mut raw = f.create("person", Map::new()).unwrap().to_json();
        raw["shoeSize"] = json!(42);
        assert_matches!(
            f.create_from_object(&raw, FromObjectOptions::default()),
            Err(DppError::InvalidObject { kind: "document", findings }) if findings.len() == 1
        );
        let d = f
            .create_from_object(&raw, FromObjectOptions { skip_validation: true })
            .unwrap();
        assert_eq!(d.get("shoeSize"), Some(&json!(42)));
    }

    #[test]
    fn document_bytes_roundtrip() {
        let f = document_factory();
        let d = f.create("note", Map::new()).unwrap();
        let back = f
            .create_from_bytes(&d.encode().unwrap(), FromObjectOptions::default())
            .unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn contract_factory_validates_objects() {
        let f = ContractFactory::new(
            ContractValidator::new(engine(), CoreConfig::default()),
            MetaSchemaVersion::V1,
        );
        let c = people_contract();
        let raw = c.to_json().unwrap();
        assert_eq!(
            f.create_from_object(raw.clone(), FromObjectOptions::default()).unwrap(),
            c
        );
        assert_eq!(
            f.create_from_bytes(&c.encode().unwrap(), FromObjectOptions::default()).unwrap(),
            c
        );

        let mut bad = raw;
        bad["version"] = json!(0);
        assert_matches!(
            f.create_from_object(bad, FromObjectOptions::default()),
            Err(DppError::InvalidObject { kind: "contract", .. })
        );
    }

    #[test]
    fn packet_factory_roundtrip() {
        let df = document_factory();
        let d = df.create("note", Map::new()).unwrap();
        let p = PacketFactory.create_with_documents(&people_contract().id().unwrap(), vec![d]);
        let back = PacketFactory.create_from_bytes(&p.encode().unwrap(), "alice").unwrap();
        assert_eq!(back, p);
    }
}
