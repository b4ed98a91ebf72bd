//! Shared fixtures for unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::errors::{DppError, DppResult};
use crate::model::contract::Contract;
use crate::model::document::Document;
use crate::provider::{DataProvider, DocumentQuery, TransactionInfo};
use crate::version::CONTRACT_META_SCHEMA_URI_V1;

/// `person` with unique indices on `($userId, lastName)` and
/// `($userId, email)`, plus an unindexed `note` type.
pub fn people_contract() -> Contract {
    let mut docs = BTreeMap::new();
    docs.insert(
        "person".to_string(),
        json!({
            "properties": {
                "firstName": { "type": "string" },
                "lastName": { "type": "string" },
                "email": { "type": "string" }
            },
            "additionalProperties": false,
            "indices": [
                { "properties": [{ "$userId": "asc" }, { "lastName": "asc" }], "unique": true },
                { "properties": [{ "$userId": "asc" }, { "email": "asc" }], "unique": true }
            ]
        }),
    );
    docs.insert(
        "note".to_string(),
        json!({
            "properties": { "text": { "type": "string" } },
            "additionalProperties": false
        }),
    );
    Contract::new(CONTRACT_META_SCHEMA_URI_V1, "people", docs)
}

#[derive(Default)]
pub struct StubProvider {
    contracts: BTreeMap<String, Contract>,
    documents: Mutex<Vec<(String, Document)>>,
    pub document_fetches: AtomicUsize,
    pub fail: bool,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contract(mut self, contract: Contract) -> Self {
        if let Ok(id) = contract.id() {
            self.contracts.insert(id, contract);
        }
        self
    }

    pub fn with_document(self, contract_id: &str, document: Document) -> Self {
        self.documents
            .lock()
            .push((contract_id.to_string(), document));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn fetches(&self) -> usize {
        self.document_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for StubProvider {
    async fn fetch_contract(&self, contract_id: &str) -> DppResult<Option<Contract>> {
        if self.fail {
            return Err(DppError::provider("unavailable"));
        }
        Ok(self.contracts.get(contract_id).cloned())
    }

    async fn fetch_documents(
        &self,
        contract_id: &str,
        doc_type: &str,
        query: &DocumentQuery,
    ) -> DppResult<Vec<Document>> {
        self.document_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DppError::provider("unavailable"));
        }
        Ok(self
            .documents
            .lock()
            .iter()
            .filter(|(c, d)| c == contract_id && d.doc_type() == doc_type && query.matches(d))
            .map(|(_, d)| d.clone())
            .collect())
    }

    async fn fetch_transaction(&self, _id: &str) -> DppResult<Option<TransactionInfo>> {
        Ok(None)
    }
}
