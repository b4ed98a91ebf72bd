//! Accumulated validation findings.
//!
//! A finding is one reason a packet is rejected. Checks never stop at the
//! first finding; every stage returns a [`ValidationResult`] and callers merge
//! them, so a rejected packet carries the complete list of reasons.
//!
//! Each variant has a stable dotted [`Finding::code`] for machine consumers
//! and a [`FindingCategory`] grouping it by the kind of rule it enforces.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::model::index::IndexDefinition;
use crate::schema::SchemaViolation;

/// Coarse grouping of findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FindingCategory {
    Structural,
    IdentityType,
    Lifecycle,
    Scope,
    Duplication,
    ContractConsistency,
    Packet,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::IdentityType => "identity",
            Self::Lifecycle => "lifecycle",
            Self::Scope => "scope",
            Self::Duplication => "duplication",
            Self::ContractConsistency => "contract",
            Self::Packet => "packet",
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a unique-index collision was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSource {
    /// Another document in the same packet.
    Packet,
    /// A document already persisted by the data provider.
    Persisted,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Finding {
    #[error("schema violation at {}: {}", .violation.instance_path, .violation.message)]
    JsonSchema { violation: SchemaViolation },

    /// Passed its schema but could not be decoded into a document.
    #[error("document cannot be decoded: {reason}")]
    UndecodableDocument { document: Value, reason: String },

    #[error("document has no $type")]
    MissingDocumentType { document: Value },

    #[error("document type {document_type:?} is not defined by contract {contract_id}")]
    InvalidDocumentType {
        document_type: String,
        contract_id: String,
    },

    #[error("document has no $action")]
    MissingDocumentAction { document: Value },

    #[error("document {document_id} is already present")]
    DocumentAlreadyPresent { document_id: String },

    #[error("document {document_id} was not found")]
    DocumentNotFound { document_id: String },

    /// `expected` is `None` once the persisted revision can no longer advance.
    #[error("document {document_id} has revision {submitted}, expected {}", expected_revision(.expected))]
    InvalidDocumentRevision {
        document_id: String,
        submitted: u64,
        expected: Option<u64>,
    },

    #[error("document {document_id} is owned by {owner}, not {submitter}")]
    DocumentOwnerMismatch {
        document_id: String,
        owner: String,
        submitter: String,
    },

    #[error("document scope {actual} does not match expected {expected}")]
    InvalidDocumentScope { expected: String, actual: String },

    #[error("document scope id {scope_id:?} is malformed")]
    InvalidDocumentScopeId { scope_id: String },

    #[error("{} documents share the same type and id", .documents.len())]
    DuplicateDocuments { documents: Vec<Value> },

    #[error(
        "{} documents of type {document_type:?} collide on a unique index ({origin:?})",
        .documents.len()
    )]
    DuplicateDocumentsByIndex {
        document_type: String,
        index: IndexDefinition,
        documents: Vec<Value>,
        origin: DuplicateSource,
    },

    #[error("packet contractId {declared} does not match contract id {computed}")]
    InvalidContractId { declared: String, computed: String },

    #[error("contract {contract_id} is already present")]
    ContractAlreadyPresent { contract_id: String },

    #[error("contract {contract_id} is not present")]
    ContractNotPresent { contract_id: String },

    #[error("document type {document_type:?} declares the same index twice")]
    DuplicateIndex {
        document_type: String,
        index: IndexDefinition,
    },

    #[error("unique index of {document_type:?} must start with $userId")]
    UniqueIndexMustHaveUserIdPrefix {
        document_type: String,
        index: IndexDefinition,
    },

    #[error("index of {document_type:?} refers to undefined property {property:?}")]
    UndefinedIndexProperty {
        document_type: String,
        property: String,
    },

    #[error("packet carries neither a contract nor documents")]
    EmptyPacket,

    #[error("packet carries {count} documents, maximum is {max}")]
    TooManyDocuments { count: usize, max: usize },

    #[error("declared itemsHash {declared:?} does not match computed {computed:?}")]
    InvalidItemsHash {
        declared: Option<String>,
        computed: Option<String>,
    },

    #[error("declared itemsMerkleRoot {declared:?} does not match computed {computed:?}")]
    InvalidItemsMerkleRoot {
        declared: Option<String>,
        computed: Option<String>,
    },
}

impl Finding {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::JsonSchema { .. } => "structure.json_schema",
            Self::UndecodableDocument { .. } => "structure.undecodable",
            Self::MissingDocumentType { .. } => "document.type.missing",
            Self::InvalidDocumentType { .. } => "document.type.invalid",
            Self::MissingDocumentAction { .. } => "document.action.missing",
            Self::DocumentAlreadyPresent { .. } => "document.already_present",
            Self::DocumentNotFound { .. } => "document.not_found",
            Self::InvalidDocumentRevision { .. } => "document.revision.invalid",
            Self::DocumentOwnerMismatch { .. } => "document.owner.mismatch",
            Self::InvalidDocumentScope { .. } => "document.scope.invalid",
            Self::InvalidDocumentScopeId { .. } => "document.scope_id.invalid",
            Self::DuplicateDocuments { .. } => "duplicate.fingerprint",
            Self::DuplicateDocumentsByIndex { .. } => "duplicate.unique_index",
            Self::InvalidContractId { .. } => "contract.id.mismatch",
            Self::ContractAlreadyPresent { .. } => "contract.already_present",
            Self::ContractNotPresent { .. } => "contract.not_present",
            Self::DuplicateIndex { .. } => "contract.index.duplicate",
            Self::UniqueIndexMustHaveUserIdPrefix { .. } => "contract.index.user_id_prefix",
            Self::UndefinedIndexProperty { .. } => "contract.index.undefined_property",
            Self::EmptyPacket => "packet.empty",
            Self::TooManyDocuments { .. } => "packet.too_many_documents",
            Self::InvalidItemsHash { .. } => "packet.items_hash.mismatch",
            Self::InvalidItemsMerkleRoot { .. } => "packet.items_merkle_root.mismatch",
        }
    }

    pub fn category(&self) -> FindingCategory {
        match self {
            Self::JsonSchema { .. } | Self::UndecodableDocument { .. } => {
                FindingCategory::Structural
            }
            Self::MissingDocumentType { .. }
            | Self::InvalidDocumentType { .. }
            | Self::MissingDocumentAction { .. } => FindingCategory::IdentityType,
            Self::DocumentAlreadyPresent { .. }
            | Self::DocumentNotFound { .. }
            | Self::InvalidDocumentRevision { .. }
            | Self::DocumentOwnerMismatch { .. } => FindingCategory::Lifecycle,
            Self::InvalidDocumentScope { .. } | Self::InvalidDocumentScopeId { .. } => {
                FindingCategory::Scope
            }
            Self::DuplicateDocuments { .. } | Self::DuplicateDocumentsByIndex { .. } => {
                FindingCategory::Duplication
            }
            Self::InvalidContractId { .. }
            | Self::ContractAlreadyPresent { .. }
            | Self::ContractNotPresent { .. }
            | Self::DuplicateIndex { .. }
            | Self::UniqueIndexMustHaveUserIdPrefix { .. }
            | Self::UndefinedIndexProperty { .. } => FindingCategory::ContractConsistency,
            Self::EmptyPacket
            | Self::TooManyDocuments { .. }
            | Self::InvalidItemsHash { .. }
            | Self::InvalidItemsMerkleRoot { .. } => FindingCategory::Packet,
        }
    }
}

impl From<SchemaViolation> for Finding {
    fn from(violation: SchemaViolation) -> Self {
        Self::JsonSchema { violation }
    }
}

fn expected_revision(expected: &Option<u64>) -> String {
    expected.map_or_else(|| "none".to_string(), |r| r.to_string())
}

/// Mergeable container of findings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    findings: Vec<Finding>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: impl Into<Finding>) {
        self.findings.push(finding.into());
    }

    pub fn extend<I>(&mut self, findings: I)
    where
        I: IntoIterator,
        I::Item: Into<Finding>,
    {
        self.findings.extend(findings.into_iter().map(Into::into));
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.findings.extend(other.findings);
    }

    pub fn is_valid(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.findings.iter().map(Finding::code).collect()
    }
}

impl From<Vec<Finding>> for ValidationResult {
    fn from(findings: Vec<Finding>) -> Self {
        Self { findings }
    }
}

impl FromIterator<Finding> for ValidationResult {
    fn from_iter<T: IntoIterator<Item = Finding>>(iter: T) -> Self {
        Self {
            findings: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationResult {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.findings.into_iter()
    }
}
