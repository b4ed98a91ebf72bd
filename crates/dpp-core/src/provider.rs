//! Persisted-state provider interface.
//!
//! The verifier never reads storage directly. Everything it needs to know
//! about previously accepted state comes through [`DataProvider`], whose
//! lookups are awaited and may be issued concurrently within one pass.
//! Failures propagate as fatal errors; retry policy belongs to the caller.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::DppResult;
use crate::model::contract::Contract;
use crate::model::document::Document;

/// One constraint of a document query.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field (`$userId`, `$id` or a payload path) equals a value.
    Equal { field: String, value: Value },
    /// Document id is one of the given ids.
    IdIn(Vec<String>),
    /// Document id is none of the given ids.
    IdNotIn(Vec<String>),
}

impl Condition {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::Equal { field, value } => document.index_value(field).as_ref() == Some(value),
            Self::IdIn(ids) => ids.iter().any(|id| id == document.id()),
            Self::IdNotIn(ids) => !ids.iter().any(|id| id == document.id()),
        }
    }
}

/// Conjunction of conditions. An empty query matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub conditions: Vec<Condition>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::Equal {
            field: field.into(),
            value,
        });
        self
    }

    pub fn id_in(mut self, ids: Vec<String>) -> Self {
        self.conditions.push(Condition::IdIn(ids));
        self
    }

    pub fn id_not_in(mut self, ids: Vec<String>) -> Self {
        self.conditions.push(Condition::IdNotIn(ids));
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }
}

/// Base-ledger transaction as seen by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionInfo {
    pub confirmations: u64,
}

#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch_contract(&self, contract_id: &str) -> DppResult<Option<Contract>>;

    async fn fetch_documents(
        &self,
        contract_id: &str,
        doc_type: &str,
        query: &DocumentQuery,
    ) -> DppResult<Vec<Document>>;

    /// Used by the identity layer only; the document pipeline never calls it.
    async fn fetch_transaction(&self, id: &str) -> DppResult<Option<TransactionInfo>>;
}
