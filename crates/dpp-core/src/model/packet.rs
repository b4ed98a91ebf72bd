//! Packet model.
//!
//! A packet is the atomic submission unit. It carries either one contract
//! (introducing it) or a batch of documents, never both. The integrity
//! commitment (`itemsHash`, `itemsMerkleRoot`) is derived from the items and
//! is therefore not settable.
//!
//! Wire form:
//!
//! ```json
//! { "contractId": "<hex>", "itemsMerkleRoot": "<hex>|null", "itemsHash": "<hex>|null",
//!   "contracts": [ ... ], "documents": [ ... ] }
//! ```

use serde_json::{json, Value};

use crate::errors::{DppError, DppResult};
use crate::model::contract::Contract;
use crate::model::document::Document;

pub const PROPERTY_CONTRACT_ID: &str = "contractId";
pub const PROPERTY_ITEMS_MERKLE_ROOT: &str = "itemsMerkleRoot";
pub const PROPERTY_ITEMS_HASH: &str = "itemsHash";
pub const PROPERTY_CONTRACTS: &str = "contracts";
pub const PROPERTY_DOCUMENTS: &str = "documents";

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    contract_id: String,
    contract: Option<Contract>,
    documents: Vec<Document>,
}

impl Packet {
    /// An empty packet for `contract_id`.
    pub fn new(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            contract: None,
            documents: Vec::new(),
        }
    }

    /// A packet introducing `contract`; `contractId` is taken from its id.
    pub fn with_contract(contract: Contract) -> DppResult<Self> {
        Ok(Self {
            contract_id: contract.id()?,
            contract: Some(contract),
            documents: Vec::new(),
        })
    }

    /// A packet submitting `documents` under `contract_id`.
    pub fn with_documents(contract_id: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            contract_id: contract_id.into(),
            contract: None,
            documents,
        }
    }

    /// Decode the keyed JSON form. Documents are bound to `user_id`.
    ///
    /// Declared `itemsHash`/`itemsMerkleRoot` are ignored here; the verifier
    /// compares them against recomputed values.
    pub fn from_json(raw: &Value, user_id: &str) -> DppResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| DppError::invalid_argument("packet must be an object"))?;

        let contract_id = obj
            .get(PROPERTY_CONTRACT_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| DppError::invalid_argument("packet contractId must be a string"))?;

        let contracts = array_field(obj, PROPERTY_CONTRACTS)?;
        let documents = array_field(obj, PROPERTY_DOCUMENTS)?;

        if contracts.len() > 1 {
            return Err(DppError::invalid_argument(format!(
                "packet may carry at most one contract, got {}",
                contracts.len()
            )));
        }
        if !contracts.is_empty() && !documents.is_empty() {
            return Err(DppError::ContractAndDocumentsNotAllowed);
        }

        let contract = contracts
            .first()
            .map(|c| Contract::from_json(c.clone()))
            .transpose()?;
        let documents = documents
            .iter()
            .map(|d| Document::from_json(d, user_id))
            .collect::<DppResult<Vec<_>>>()?;

        Ok(Self {
            contract_id: contract_id.to_string(),
            contract,
            documents,
        })
    }

    pub fn to_json(&self) -> DppResult<Value> {
        let commitment = crate::integrity::PacketCommitment::of(self)?;
        let contracts = self
            .contract
            .iter()
            .map(Contract::to_json)
            .collect::<DppResult<Vec<_>>>()?;
        let documents: Vec<Value> = self.documents.iter().map(Document::to_json).collect();

        Ok(json!({
            PROPERTY_CONTRACT_ID: self.contract_id,
            PROPERTY_ITEMS_MERKLE_ROOT: commitment.items_merkle_root,
            PROPERTY_ITEMS_HASH: commitment.items_hash,
            PROPERTY_CONTRACTS: contracts,
            PROPERTY_DOCUMENTS: documents,
        }))
    }

    /// Canonical CBOR bytes. Each item is held to the encoding ceiling when
    /// its hash is computed; the packet envelope itself is not.
    pub fn encode(&self) -> DppResult<Vec<u8>> {
        crate::canonical::encode(&self.to_json()?)
    }

    pub fn decode(bytes: &[u8], user_id: &str) -> DppResult<Self> {
        Self::from_json(&crate::canonical::decode(bytes)?, user_id)
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    pub fn set_contract_id(&mut self, contract_id: impl Into<String>) -> &mut Self {
        self.contract_id = contract_id.into();
        self
    }

    pub fn contract(&self) -> Option<&Contract> {
        self.contract.as_ref()
    }

    /// Attach or clear the contract. Fails while documents are present.
    pub fn set_contract(&mut self, contract: Option<Contract>) -> DppResult<&mut Self> {
        if contract.is_some() && !self.documents.is_empty() {
            return Err(DppError::ContractAndDocumentsNotAllowed);
        }
        self.contract = contract;
        Ok(self)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Replace the documents. Fails while a contract is present.
    pub fn set_documents(&mut self, documents: Vec<Document>) -> DppResult<&mut Self> {
        if !documents.is_empty() && self.contract.is_some() {
            return Err(DppError::ContractAndDocumentsNotAllowed);
        }
        self.documents = documents;
        Ok(self)
    }

    pub fn add_document(&mut self, document: Document) -> DppResult<&mut Self> {
        if self.contract.is_some() {
            return Err(DppError::ContractAndDocumentsNotAllowed);
        }
        self.documents.push(document);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.contract.is_none() && self.documents.is_empty()
    }

    pub fn items_hash(&self) -> DppResult<Option<String>> {
        Ok(crate::integrity::PacketCommitment::of(self)?.items_hash)
    }

    pub fn items_merkle_root(&self) -> DppResult<Option<String>> {
        Ok(crate::integrity::PacketCommitment::of(self)?.items_merkle_root)
    }
}

fn array_field<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
) -> DppResult<&'a [Value]> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(DppError::invalid_argument(format!(
            "packet {key} must be an array"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::{compute_scope, Action};
    use crate::version::CONTRACT_META_SCHEMA_URI_V1;
    use std::collections::BTreeMap;

    fn contract() -> Contract {
        let mut docs = BTreeMap::new();
        docs.insert(
            "note".to_string(),
            json!({"properties": {"text": {"type": "string"}}, "additionalProperties": false}),
        );
        Contract::new(CONTRACT_META_SCHEMA_URI_V1, "notes", docs)
    }

    fn document(contract_id: &str) -> Document {
        let mut d = Document::new(
            "note",
            compute_scope(contract_id, "alice"),
            crate::entropy::generate(),
            "alice",
        );
        d.set("text", json!("hi")).unwrap();
        d
    }

    #[test]
    fn contract_and_documents_are_exclusive() {
        let c = contract();
        let id = c.id().unwrap();

        let mut p = Packet::with_documents(&id, vec![document(&id)]);
        assert!(matches!(
            p.set_contract(Some(c.clone())),
            Err(DppError::ContractAndDocumentsNotAllowed)
        ));

        let mut p = Packet::with_contract(c).unwrap();
        assert!(matches!(
            p.set_documents(vec![document(&id)]),
            Err(DppError::ContractAndDocumentsNotAllowed)
        ));
        assert!(matches!(
            p.add_document(document(&id)),
            Err(DppError::ContractAndDocumentsNotAllowed)
        ));
        // clearing is always allowed
        p.set_documents(Vec::new()).unwrap();
    }

    #[test]
    fn empty_packet_has_no_commitment() {
        let p = Packet::new("abc");
        assert!(p.is_empty());
        assert_eq!(p.items_hash().unwrap(), None);
        assert_eq!(p.items_merkle_root().unwrap(), None);
        let v = p.to_json().unwrap();
        assert_eq!(v[PROPERTY_ITEMS_HASH], Value::Null);
        assert_eq!(v[PROPERTY_CONTRACTS], json!([]));
    }

    #[test]
    fn wire_roundtrip() {
        let c = contract();
        let id = c.id().unwrap();
        let mut doc = document(&id);
        doc.set_action(Action::Update).set_revision(3);
        let p = Packet::with_documents(&id, vec![document(&id), doc]);
        let back = Packet::decode(&p.encode().unwrap(), "alice").unwrap();
        assert_eq!(back, p);
        assert_eq!(back.items_hash().unwrap(), p.items_hash().unwrap());

        let p = Packet::with_contract(contract()).unwrap();
        let back = Packet::decode(&p.encode().unwrap(), "alice").unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn decode_rejects_both_item_kinds() {
        let c = contract();
        let id = c.id().unwrap();
        let raw = json!({
            "contractId": id,
            "contracts": [c.to_json().unwrap()],
            "documents": [document(&id).to_json()],
        });
        assert!(matches!(
            Packet::from_json(&raw, "alice"),
            Err(DppError::ContractAndDocumentsNotAllowed)
        ));
    }
}
