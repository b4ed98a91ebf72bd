//! Data models.
//!
//! - [`contract::Contract`]: document-type schemas plus a content-derived id.
//! - [`document::Document`]: system fields, open payload, lazily cached id.
//! - [`packet::Packet`]: one contract *or* a batch of documents.
//! - [`index::IndexDefinition`]: contract-declared field-tuple indices.
//!
//! Models are plain data. Validation lives in [`crate::schema`] and
//! [`crate::verify`]; hashing of the canonical form lives in
//! [`crate::canonical`] and [`crate::hash`].

pub mod contract;
pub mod document;
pub mod index;
pub mod packet;

pub use contract::Contract;
pub use document::{Action, Document};
pub use index::{IndexDefinition, IndexOrder, IndexProperty};
pub use packet::Packet;
