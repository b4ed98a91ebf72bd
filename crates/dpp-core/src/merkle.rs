//! Binary merkle root over item hashes.
//!
//! Construction (ledger style):
//! - leaves are the item digests themselves (no extra leaf hashing)
//! - each level pairs adjacent nodes left to right: `H(left ‖ right)`
//! - an odd node at the end of a level is paired with itself
//! - a single leaf is the root

use crate::errors::DppResult;
use crate::hash::{decode_digest_hex, hash_node, DIGEST_LEN};

/// Compute the merkle root of raw digests. `None` for an empty input.
pub fn merkle_root(leaves: &[[u8; DIGEST_LEN]]) -> Option<[u8; DIGEST_LEN]> {
    if leaves.is_empty() {
        return None;
    }

    let mut level: Vec<[u8; DIGEST_LEN]> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_node(left, right),
                [single] => hash_node(single, single),
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
    }
    level.pop()
}

/// Compute the merkle root of hex digests, returning hex. `None` for an empty input.
pub fn merkle_root_hex(leaves: &[String]) -> DppResult<Option<String>> {
    let decoded = leaves
        .iter()
        .map(|h| decode_digest_hex(h))
        .collect::<DppResult<Vec<_>>>()?;
    Ok(merkle_root(&decoded).map(hex::encode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{hash_bytes, hash_hex};
    use proptest::prelude::*;

    #[test]
    fn empty_has_no_root() {
        assert_eq!(merkle_root(&[]), None);
        assert_eq!(merkle_root_hex(&[]).unwrap(), None);
    }

    #[test]
    fn single_leaf_is_root() {
        let h = hash_hex(b"only");
        assert_eq!(merkle_root_hex(&[h.clone()]).unwrap(), Some(h));
    }

    #[test]
    fn two_leaves() {
        let a = hash_bytes(b"a");
        let b = hash_bytes(b"b");
        assert_eq!(merkle_root(&[a, b]), Some(hash_node(&a, &b)));
    }

    #[test]
    fn odd_level_duplicates_last() {
        let a = hash_bytes(b"a");
        let b = hash_bytes(b"b");
        let c = hash_bytes(b"c");
        let expected = hash_node(&hash_node(&a, &b), &hash_node(&c, &c));
        assert_eq!(merkle_root(&[a, b, c]), Some(expected));
    }

    #[test]
    fn order_matters() {
        let a = hash_bytes(b"a");
        let b = hash_bytes(b"b");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(merkle_root_hex(&["xyz".to_string()]).is_err());
    }

    proptest! {
        #[test]
        fn root_is_deterministic(seeds in proptest::collection::vec(any::<u64>(), 1..40)) {
            let leaves: Vec<_> = seeds.iter().map(|s| hash_bytes(&s.to_le_bytes())).collect();
            prop_assert_eq!(merkle_root(&leaves), merkle_root(&leaves));
            prop_assert!(merkle_root(&leaves).is_some());
        }
    }
}
