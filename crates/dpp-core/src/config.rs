//! Configuration structures for dpp-core.
//!
//! Configuration objects are explicit and caller-supplied. The core crate
//! never reads environment variables or files, so two nodes configured the
//! same way reach the same verdict on the same packet.

use crate::errors::{DppError, DppResult};
use crate::version::MetaSchemaVersion;

/// Global configuration container.
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub limits: LimitsConfig,
    pub validation: ValidationConfig,
}

/// Size and count limits.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Ceiling for the canonical encoding of one document or contract.
    pub max_encoded_bytes: usize,
    pub max_documents_per_packet: usize,
    pub max_document_types: usize,
    pub max_indices_per_type: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_encoded_bytes: crate::canonical::MAX_ENCODED_BYTES,
            max_documents_per_packet: 1000,
            max_document_types: 100,
            max_indices_per_type: 100,
        }
    }
}

/// Validation rules that are protocol parameters rather than constants.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Meta-schema every contract must declare.
    pub meta_schema: MetaSchemaVersion,
    /// Unique indices must start with `$userId`.
    pub require_user_id_index_prefix: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            meta_schema: MetaSchemaVersion::V1,
            require_user_id_index_prefix: true,
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &CoreConfig) -> DppResult<()> {
    if cfg.limits.max_encoded_bytes == 0 {
        return Err(DppError::invalid_argument(
            "max_encoded_bytes must be greater than zero",
        ));
    }

    if cfg.limits.max_encoded_bytes > crate::canonical::MAX_ENCODED_BYTES {
        return Err(DppError::invalid_argument(format!(
            "max_encoded_bytes must not exceed the protocol ceiling of {} bytes",
            crate::canonical::MAX_ENCODED_BYTES
        )));
    }

    if cfg.limits.max_documents_per_packet == 0 {
        return Err(DppError::invalid_argument(
            "max_documents_per_packet must be greater than zero",
        ));
    }

    if cfg.limits.max_document_types == 0 {
        return Err(DppError::invalid_argument(
            "max_document_types must be greater than zero",
        ));
    }

    Ok(())
}
