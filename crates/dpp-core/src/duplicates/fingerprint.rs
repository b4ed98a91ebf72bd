//! Fingerprint duplicates: documents sharing `(type, id)` in one packet.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde_json::Value;

use crate::findings::{Finding, ValidationResult};
use crate::model::document::{compute_id, PROPERTY_SCOPE, PROPERTY_SCOPE_ID, PROPERTY_TYPE};

/// `(type, id)` of a raw document, or `None` when the fields needed to
/// derive it are missing. Such documents are reported by structure checks.
pub fn fingerprint(raw: &Value) -> Option<(String, String)> {
    let doc_type = raw.get(PROPERTY_TYPE)?.as_str()?;
    let scope = raw.get(PROPERTY_SCOPE)?.as_str()?;
    let scope_id = raw.get(PROPERTY_SCOPE_ID)?.as_str()?;
    Some((doc_type.to_string(), compute_id(scope, scope_id)))
}

/// One finding per fingerprint seen more than once, naming every document
/// that carries it. Findings follow the order of first occurrence.
pub fn find_duplicate_fingerprints(raw_documents: &[Value]) -> ValidationResult {
    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (pos, raw) in raw_documents.iter().enumerate() {
        if let Some(fp) = fingerprint(raw) {
            groups.entry(fp).or_default().push(pos);
        }
    }

    groups
        .into_values()
        .filter(|positions| positions.len() > 1)
        .sorted_by_key(|positions| positions[0])
        .map(|positions| Finding::DuplicateDocuments {
            documents: positions
                .into_iter()
                .map(|p| raw_documents[p].clone())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::{compute_scope, Document};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn raw(doc_type: &str, scope_id: &str) -> Value {
        Document::new(doc_type, compute_scope("c", "alice"), scope_id, "alice").to_json()
    }

    #[test]
    fn distinct_documents_pass() {
        let docs = vec![raw("person", "a"), raw("person", "b"), raw("note", "a")];
        assert!(find_duplicate_fingerprints(&docs).is_valid());
    }

    #[test]
    fn a_pair_yields_exactly_one_finding_naming_both() {
        let docs = vec![raw("person", "a"), raw("note", "x"), raw("person", "a")];
        let findings = find_duplicate_fingerprints(&docs).into_findings();
        assert_eq!(findings.len(), 1);
        assert_matches!(&findings[0], Finding::DuplicateDocuments { documents } => {
            assert_eq!(documents, &vec![docs[0].clone(), docs[2].clone()]);
        });
    }

    #[test]
    fn every_member_of_a_group_is_returned() {
        let docs = vec![raw("person", "a"), raw("person", "a"), raw("person", "a")];
        let findings = find_duplicate_fingerprints(&docs).into_findings();
        assert_matches!(&findings[..], [Finding::DuplicateDocuments { documents }] if documents.len() == 3);
    }

    #[test]
    fn undecodable_documents_are_skipped() {
        let docs = vec![json!({"$type": "person"}), json!({"$type": "person"})];
        assert!(find_duplicate_fingerprints(&docs).is_valid());
    }
}
