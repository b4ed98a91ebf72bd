//! dpp-core
//!
//! Validation and verification core for contract-governed document packets:
//! - Contract / Document / Packet models with content-derived ids
//! - Canonical CBOR encoding and double-SHA-256 hashing
//! - Schema enrichment and structural validation behind a pluggable engine
//! - Fingerprint and unique-index duplicate detection
//! - Packet integrity commitments (items hash, merkle root)
//! - The verification pipeline against a persisted-state provider

pub mod canonical;
pub mod config;
pub mod duplicates;
pub mod entropy;
pub mod errors;
pub mod factory;
pub mod findings;
pub mod hash;
pub mod integrity;
pub mod merkle;
pub mod model;
pub mod provider;
pub mod schema;
pub mod value;
pub mod verify;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::errors::{DppError, DppResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::config::CoreConfig;
    pub use crate::factory::{ContractFactory, DocumentFactory, FromObjectOptions, PacketFactory};
    pub use crate::findings::{DuplicateSource, Finding, FindingCategory, ValidationResult};
    pub use crate::model::{Action, Contract, Document, IndexDefinition, Packet};
    pub use crate::provider::{Condition, DataProvider, DocumentQuery, TransactionInfo};
    #[cfg(feature = "jsonschema-engine")]
    pub use crate::schema::JsonSchemaEngine;
    pub use crate::schema::{ContractValidator, DocumentValidator, SchemaEngine, SchemaViolation};
    pub use crate::verify::{PacketVerifier, VerifyReport};
    pub use crate::{DppError, DppResult};
}
