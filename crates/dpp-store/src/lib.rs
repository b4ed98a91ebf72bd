//! dpp-store
//!
//! In-memory persisted state for DPP packet verification.
//!
//! [`MemoryDataProvider`] implements [`dpp_core::provider::DataProvider`]
//! over plain maps behind a `parking_lot` lock. It is meant for tests, local
//! tooling and as a reference for real storage adapters: lookups never block
//! on I/O and every query is evaluated with [`DocumentQuery::matches`].
//!
//! Deletes are not tombstoned: [`MemoryDataProvider::apply`] removes the
//! document, so a later CREATE with the same `(scope, scopeId)`, and hence
//! the same id, is accepted again at revision 0.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use dpp_core::model::{Action, Contract, Document, Packet};
use dpp_core::provider::{DataProvider, DocumentQuery, TransactionInfo};
use dpp_core::{DppError, DppResult};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] DppError),

    #[error("contract {0} is not stored")]
    UnknownContract(String),

    #[error("document {0} is not stored")]
    UnknownDocument(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Documents of one `(contract id, type)` collection, keyed by id.
type Collection = BTreeMap<String, Document>;

#[derive(Debug, Default)]
struct State {
    contracts: BTreeMap<String, Contract>,
    documents: BTreeMap<(String, String), Collection>,
    transactions: BTreeMap<String, TransactionInfo>,
}

#[derive(Debug, Default)]
pub struct MemoryDataProvider {
    state: RwLock<State>,
    document_queries: AtomicUsize,
}

impl MemoryDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a contract under its derived id and return the id.
    pub fn insert_contract(&self, contract: Contract) -> StoreResult<String> {
        let id = contract.id()?;
        self.state.write().contracts.insert(id.clone(), contract);
        Ok(id)
    }

    /// Store or replace a document under `contract_id`.
    pub fn insert_document(&self, contract_id: &str, document: Document) {
        let key = (contract_id.to_string(), document.doc_type().to_string());
        self.state
            .write()
            .documents
            .entry(key)
            .or_default()
            .insert(document.id().to_string(), document);
    }

    pub fn remove_document(&self, contract_id: &str, doc_type: &str, id: &str) -> StoreResult<Document> {
        let key = (contract_id.to_string(), doc_type.to_string());
        self.state
            .write()
            .documents
            .get_mut(&key)
            .and_then(|c| c.remove(id))
            .ok_or_else(|| StoreError::UnknownDocument(id.to_string()))
    }

    pub fn insert_transaction(&self, id: impl Into<String>, info: TransactionInfo) {
        self.state.write().transactions.insert(id.into(), info);
    }

    /// Persist an accepted packet: store its contract, or apply its
    /// document operations in order. Deletes drop the stored document.
    ///
    /// All-or-nothing: every delete target is checked under the same write
    /// lock before anything changes.
    pub fn apply(&self, packet: &Packet) -> StoreResult<()> {
        if let Some(contract) = packet.contract() {
            self.insert_contract(contract.clone())?;
            return Ok(());
        }

        let contract_id = packet.contract_id();
        let mut state = self.state.write();
        if !state.contracts.contains_key(contract_id) {
            return Err(StoreError::UnknownContract(contract_id.to_string()));
        }

        // Replay presence in packet order, so a create followed by a delete
        // of the same document is accepted.
        let mut present: BTreeMap<(&str, &str), bool> = BTreeMap::new();
        for document in packet.documents() {
            let key = (document.doc_type(), document.id());
            let exists = *present.entry(key).or_insert_with(|| {
                state
                    .documents
                    .get(&(contract_id.to_string(), key.0.to_string()))
                    .is_some_and(|c| c.contains_key(key.1))
            });
            match document.action() {
                Action::Create | Action::Update => {
                    present.insert(key, true);
                }
                Action::Delete if !exists => {
                    return Err(StoreError::UnknownDocument(document.id().to_string()));
                }
                Action::Delete => {
                    present.insert(key, false);
                }
            }
        }

        for document in packet.documents() {
            let collection = state
                .documents
                .entry((contract_id.to_string(), document.doc_type().to_string()))
                .or_default();
            match document.action() {
                Action::Create | Action::Update => {
                    collection.insert(document.id().to_string(), document.clone());
                }
                Action::Delete => {
                    collection.remove(document.id());
                }
            }
        }
        debug!(contract_id, documents = packet.documents().len(), "packet applied");
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.state.read().documents.values().map(BTreeMap::len).sum()
    }

    pub fn get_document(&self, contract_id: &str, doc_type: &str, id: &str) -> Option<Document> {
        let key = (contract_id.to_string(), doc_type.to_string());
        self.state.read().documents.get(&key)?.get(id).cloned()
    }

    /// Number of `fetch_documents` calls served so far.
    pub fn document_queries(&self) -> usize {
        self.document_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for MemoryDataProvider {
    async fn fetch_contract(&self, contract_id: &str) -> DppResult<Option<Contract>> {
        Ok(self.state.read().contracts.get(contract_id).cloned())
    }

    async fn fetch_documents(
        &self,
        contract_id: &str,
        doc_type: &str,
        query: &DocumentQuery,
    ) -> DppResult<Vec<Document>> {
        self.document_queries.fetch_add(1, Ordering::SeqCst);
        let key = (contract_id.to_string(), doc_type.to_string());
        let state = self.state.read();
        Ok(state
            .documents
            .get(&key)
            .map(|collection| {
                collection
                    .values()
                    .filter(|d| query.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_transaction(&self, id: &str) -> DppResult<Option<TransactionInfo>> {
        Ok(self.state.read().transactions.get(id).copied())
    }
}
