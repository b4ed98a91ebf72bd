//! Packet integrity commitment.
//!
//! Every item is hashed as `H(canonical(item))`. The aggregate hash commits to
//! both lists through a keyed structure; the merkle root commits to
//! `contractHashes ‖ documentHashes` in that order.

use serde_json::{json, Value};

use crate::errors::DppResult;
use crate::model::packet::Packet;

/// Per-item hashes of a packet, split by item kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsHashes {
    pub contract_hashes: Vec<String>,
    pub document_hashes: Vec<String>,
}

impl ItemsHashes {
    pub fn is_empty(&self) -> bool {
        self.contract_hashes.is_empty() && self.document_hashes.is_empty()
    }

    /// Contract hashes first, then document hashes.
    pub fn leaves(&self) -> Vec<String> {
        self.contract_hashes
            .iter()
            .chain(self.document_hashes.iter())
            .cloned()
            .collect()
    }
}

/// Both derived commitment values of a packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketCommitment {
    pub items_hash: Option<String>,
    pub items_merkle_root: Option<String>,
}

impl PacketCommitment {
    pub fn of(packet: &Packet) -> DppResult<Self> {
        Self::from_hashes(&packet_items_hashes(packet)?)
    }

    pub fn from_hashes(hashes: &ItemsHashes) -> DppResult<Self> {
        Ok(Self {
            items_hash: items_hash(hashes)?,
            items_merkle_root: items_merkle_root(hashes)?,
        })
    }
}

/// Hash one item's keyed JSON form under the encoding ceiling.
pub fn item_hash(item: &Value) -> DppResult<String> {
    crate::hash::hash_canonical_limited_hex(item, crate::canonical::MAX_ENCODED_BYTES)
}

/// Hash raw contract and document items.
pub fn items_hashes(contracts: &[Value], documents: &[Value]) -> DppResult<ItemsHashes> {
    items_hashes_with_limit(contracts, documents, crate::canonical::MAX_ENCODED_BYTES)
}

/// Hash raw items, failing if any encoding exceeds `max_bytes`.
pub fn items_hashes_with_limit(
    contracts: &[Value],
    documents: &[Value],
    max_bytes: usize,
) -> DppResult<ItemsHashes> {
    let hash = |item: &Value| crate::hash::hash_canonical_limited_hex(item, max_bytes);
    Ok(ItemsHashes {
        contract_hashes: contracts.iter().map(hash).collect::<DppResult<_>>()?,
        document_hashes: documents.iter().map(hash).collect::<DppResult<_>>()?,
    })
}

pub fn packet_items_hashes(packet: &Packet) -> DppResult<ItemsHashes> {
    let contracts = packet
        .contract()
        .map(|c| c.to_json())
        .transpose()?
        .into_iter()
        .collect::<Vec<_>>();
    let documents: Vec<Value> = packet.documents().iter().map(|d| d.to_json()).collect();
    items_hashes(&contracts, &documents)
}

/// `None` when the packet carries no items.
pub fn items_hash(hashes: &ItemsHashes) -> DppResult<Option<String>> {
    if hashes.is_empty() {
        return Ok(None);
    }
    let value = json!({
        "documentHashes": hashes.document_hashes,
        "contractHashes": hashes.contract_hashes,
    });
    crate::hash::hash_canonical_hex(&value).map(Some)
}

/// `None` when the packet carries no items.
pub fn items_merkle_root(hashes: &ItemsHashes) -> DppResult<Option<String>> {
    crate::merkle::merkle_root_hex(&hashes.leaves())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_items_have_no_commitment() {
        let h = ItemsHashes::default();
        assert_eq!(items_hash(&h).unwrap(), None);
        assert_eq!(items_merkle_root(&h).unwrap(), None);
    }

    #[test]
    fn single_item_root_is_its_hash() {
        let doc = json!({"$type": "note", "text": "hi"});
        let h = items_hashes(&[], &[doc.clone()]).unwrap();
        assert_eq!(
            items_merkle_root(&h).unwrap().as_deref(),
            Some(item_hash(&doc).unwrap().as_str())
        );
        assert!(items_hash(&h).unwrap().is_some());
    }

    #[test]
    fn contract_hashes_lead_the_leaves() {
        let c = json!({"name": "c"});
        let d = json!({"$type": "d"});
        let h = items_hashes(&[c.clone()], &[d.clone()]).unwrap();
        assert_eq!(h.leaves(), vec![item_hash(&c).unwrap(), item_hash(&d).unwrap()]);
    }

    #[test]
    fn oversized_item_is_fatal() {
        let doc = json!({"$type": "note", "text": "x".repeat(64)});
        let err = items_hashes_with_limit(&[], &[doc], 32).unwrap_err();
        assert!(matches!(err, crate::errors::DppError::PayloadTooLarge { max: 32, .. }));
    }

    #[test]
    fn item_order_changes_commitment() {
        let a = json!({"$type": "a"});
        let b = json!({"$type": "b"});
        let ab = items_hashes(&[], &[a.clone(), b.clone()]).unwrap();
        let ba = items_hashes(&[], &[b, a]).unwrap();
        assert_ne!(items_hash(&ab).unwrap(), items_hash(&ba).unwrap());
        assert_ne!(items_merkle_root(&ab).unwrap(), items_merkle_root(&ba).unwrap());
    }
}
