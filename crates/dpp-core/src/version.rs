//! Version helpers.
//!
//! Contracts declare which meta-schema they are written against through
//! their `$schema` field. This module centralizes the known meta-schema
//! URIs.

/// Meta-schema URI of the current contract format.
pub const CONTRACT_META_SCHEMA_URI_V1: &str = "https://schema.dash.org/dpp-0-4-0/meta/contract";

/// Known contract meta-schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaSchemaVersion {
    V1,
}

impl MetaSchemaVersion {
    /// Return the canonical URI.
    pub fn as_uri(&self) -> &'static str {
        match self {
            Self::V1 => CONTRACT_META_SCHEMA_URI_V1,
        }
    }
}

impl Default for MetaSchemaVersion {
    fn default() -> Self {
        Self::V1
    }
}
