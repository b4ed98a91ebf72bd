//! Duplicate detection.
//!
//! - [`fingerprint`]: the same logical document twice in one packet
//! - [`unique_index`]: collisions on contract-declared unique indices, in
//!   the packet and against persisted state

pub mod fingerprint;
pub mod unique_index;

pub use fingerprint::find_duplicate_fingerprints;
pub use unique_index::{find_in_packet, find_persisted};
