//! Entropy tokens used as document `scopeId` values.
//!
//! A token is a base58check string over a version byte and 20 random bytes,
//! the same shape as a base-ledger address. Validation is purely syntactic
//! and does not consult persisted state.

use rand::RngCore;

/// Version byte prefixed to every token.
pub const TOKEN_VERSION: u8 = 0x8c;

/// Number of random bytes in a token.
pub const TOKEN_ENTROPY_LEN: usize = 20;

/// Generate a fresh entropy token.
pub fn generate() -> String {
    let mut payload = [0u8; TOKEN_ENTROPY_LEN];
    rand::thread_rng().fill_bytes(&mut payload);
    encode(&payload)
}

/// Encode raw entropy bytes as a token.
pub fn encode(payload: &[u8; TOKEN_ENTROPY_LEN]) -> String {
    bs58::encode(payload)
        .with_check_version(TOKEN_VERSION)
        .into_string()
}

/// Returns true if `token` is a well-formed entropy token.
pub fn validate(token: &str) -> bool {
    match bs58::decode(token).with_check(None).into_vec() {
        Ok(bytes) => bytes.len() == TOKEN_ENTROPY_LEN + 1 && bytes[0] == TOKEN_VERSION,
        Err(_) => false,
    }
}
