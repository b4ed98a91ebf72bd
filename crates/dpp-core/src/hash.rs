//! Deterministic hashing utilities for DPP.
//!
//! Every identifier in the protocol (contract ids, document scopes and ids,
//! item hashes, merkle nodes) is produced by the same primitive:
//! double SHA-256, rendered as lowercase hex.
//!
//! Hashing never depends on map iteration order or default serde formatting.
//! Structured values go through [`crate::canonical`] first.

use sha2::{Digest, Sha256};
use serde_json::Value;

use crate::errors::{DppError, DppResult};

/// Length of a digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Hash raw bytes with double SHA-256.
pub fn hash_bytes(bytes: &[u8]) -> [u8; DIGEST_LEN] {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(first);
    second.into()
}

/// Hash raw bytes and return lowercase hex string.
pub fn hash_hex(bytes: &[u8]) -> String {
    hex::encode(hash_bytes(bytes))
}

/// Hash the concatenation of several string parts.
///
/// Used for derived identifiers such as `scope = H(contractId ‖ userId)`
/// and `id = H(scope ‖ scopeId)`.
pub fn hash_concat_hex(parts: &[&str]) -> String {
    let mut buf = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for p in parts {
        buf.extend_from_slice(p.as_bytes());
    }
    hash_hex(&buf)
}

/// Hash a JSON value through its canonical CBOR encoding.
pub fn hash_canonical_hex(value: &Value) -> DppResult<String> {
    let bytes = crate::canonical::encode(value)?;
    Ok(hash_hex(&bytes))
}

/// Hash a JSON value through its canonical CBOR encoding, enforcing a size ceiling.
pub fn hash_canonical_limited_hex(value: &Value, max_bytes: usize) -> DppResult<String> {
    let bytes = crate::canonical::encode_with_limit(value, max_bytes)?;
    Ok(hash_hex(&bytes))
}

/// Merkle internal node: `H(left ‖ right)` over raw digest bytes.
pub fn hash_node(left: &[u8; DIGEST_LEN], right: &[u8; DIGEST_LEN]) -> [u8; DIGEST_LEN] {
    let mut buf = [0u8; DIGEST_LEN * 2];
    buf[..DIGEST_LEN].copy_from_slice(left);
    buf[DIGEST_LEN..].copy_from_slice(right);
    hash_bytes(&buf)
}

/// Decode a hex digest into raw bytes.
pub fn decode_digest_hex(s: &str) -> DppResult<[u8; DIGEST_LEN]> {
    let bytes =
        hex::decode(s).map_err(|_| DppError::invalid_argument(format!("invalid hex digest: {s}")))?;
    bytes.try_into().map_err(|_| {
        DppError::invalid_argument(format!("digest must be {DIGEST_LEN} bytes: {s}"))
    })
}
