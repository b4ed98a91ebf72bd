//! Fatal error type for dpp-core.
//!
//! These errors abort the current operation. They are reserved for programmer
//! misuse, malformed input that cannot be decoded at all, encode-time limits,
//! and failures of external collaborators (provider, schema engine).
//!
//! Anything a submitter can get wrong in an otherwise decodable packet is a
//! [`crate::findings::Finding`] instead, accumulated into a result.

use thiserror::Error;

/// Result alias used across the crate.
pub type DppResult<T> = Result<T, DppError>;

#[derive(Debug, Error)]
pub enum DppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("encoded size {size} exceeds maximum {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unknown document action: {0}")]
    UnknownAction(u64),

    #[error("packet may carry either a contract or documents, not both")]
    ContractAndDocumentsNotAllowed,

    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("invalid {kind}: {} finding(s)", .findings.len())]
    InvalidObject {
        kind: &'static str,
        findings: Vec<crate::findings::Finding>,
    },

    #[error("document type {0:?} is not defined by the contract")]
    UndefinedDocumentType(String),

    #[error("data provider error: {0}")]
    Provider(String),

    #[error("schema engine error: {0}")]
    SchemaEngine(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl DppError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn schema_engine(msg: impl Into<String>) -> Self {
        Self::SchemaEngine(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
}

impl From<serde_json::Error> for DppError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
