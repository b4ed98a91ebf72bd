//! Document lifecycle and scope checks.
//!
//! ```text
//! ABSENT --create(rev 0)--> CREATED --update(rev n+1)--> UPDATED ... --delete(rev n+1)--> DELETED
//! ```
//!
//! Persisted state is fetched once per document type (all ids of that type
//! in one query), with the per-type fetches running concurrently.

use std::collections::{BTreeMap, HashMap};

use futures::future::try_join_all;
use itertools::Itertools;
use tracing::debug;

use crate::errors::DppResult;
use crate::findings::{Finding, ValidationResult};
use crate::model::document::{compute_scope, Action, Document};
use crate::provider::{DataProvider, DocumentQuery};

/// Check create/update/delete transitions against persisted documents.
pub async fn check_lifecycle(
    provider: &dyn DataProvider,
    contract_id: &str,
    documents: &[Document],
) -> DppResult<ValidationResult> {
    let mut ids_by_type: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for document in documents {
        ids_by_type
            .entry(document.doc_type())
            .or_default()
            .push(document.id().to_string());
    }

    let batches: Vec<(&str, Vec<String>)> = ids_by_type
        .into_iter()
        .map(|(doc_type, ids)| (doc_type, ids.into_iter().unique().collect()))
        .collect();
    debug!(batches = batches.len(), "lifecycle fetches");

    let fetched = try_join_all(batches.iter().map(|(doc_type, ids)| {
        let query = DocumentQuery::new().id_in(ids.clone());
        async move { provider.fetch_documents(contract_id, doc_type, &query).await }
    }))
    .await?;

    let persisted: HashMap<(String, String), Document> = fetched
        .into_iter()
        .flatten()
        .map(|d| ((d.doc_type().to_string(), d.id().to_string()), d))
        .collect();

    let mut result = ValidationResult::new();
    for document in documents {
        let key = (document.doc_type().to_string(), document.id().to_string());
        let stored = persisted.get(&key);

        match document.action() {
            Action::Create => {
                if stored.is_some() {
                    result.push(Finding::DocumentAlreadyPresent {
                        document_id: document.id().to_string(),
                    });
                }
                if document.revision() != 0 {
                    result.push(Finding::InvalidDocumentRevision {
                        document_id: document.id().to_string(),
                        submitted: document.revision(),
                        expected: Some(0),
                    });
                }
            }
            Action::Update | Action::Delete => {
                let Some(stored) = stored else {
                    result.push(Finding::DocumentNotFound {
                        document_id: document.id().to_string(),
                    });
                    continue;
                };
                let expected = stored.revision().checked_add(1);
                if Some(document.revision()) != expected {
                    result.push(Finding::InvalidDocumentRevision {
                        document_id: document.id().to_string(),
                        submitted: document.revision(),
                        expected,
                    });
                }
                if stored.user_id() != document.user_id() {
                    result.push(Finding::DocumentOwnerMismatch {
                        document_id: document.id().to_string(),
                        owner: stored.user_id().to_string(),
                        submitter: document.user_id().to_string(),
                    });
                }
            }
        }
    }

    Ok(result)
}

/// Check that every document is bound to `contract_id` and `user_id`, and
/// that its scope id is a well-formed entropy token.
pub fn check_scope(contract_id: &str, user_id: &str, documents: &[Document]) -> ValidationResult {
    let expected = compute_scope(contract_id, user_id);
    let mut result = ValidationResult::new();
    for document in documents {
        if document.scope() != expected {
            result.push(Finding::InvalidDocumentScope {
                expected: expected.clone(),
                actual: document.scope().to_string(),
            });
        }
        if !crate::entropy::validate(document.scope_id()) {
            result.push(Finding::InvalidDocumentScopeId {
                scope_id: document.scope_id().to_string(),
            });
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{people_contract, StubProvider};
    use assert_matches::assert_matches;
    use serde_json::json;

    struct Fixture {
        contract_id: String,
        stored: Document,
        provider: StubProvider,
    }

    /// A persisted `person` at revision 3.
    fn fixture() -> Fixture {
        let contract_id = people_contract().id().unwrap();
        let mut stored = Document::new(
            "person",
            compute_scope(&contract_id, "alice"),
            crate::entropy::generate(),
            "alice",
        );
        stored.set("lastName", json!("Birkin")).unwrap();
        stored.set_revision(3).set_action(Action::Update);
        let provider = StubProvider::new().with_document(&contract_id, stored.clone());
        Fixture {
            contract_id,
            stored,
            provider,
        }
    }

    async fn submit(f: &Fixture, action: Action, revision: u64) -> Vec<Finding> {
        let mut d = f.stored.clone();
        d.set_action(action).set_revision(revision);
        check_lifecycle(&f.provider, &f.contract_id, &[d])
            .await
            .unwrap()
            .into_findings()
    }

    #[tokio::test]
    async fn update_and_delete_need_next_revision() {
        let f = fixture();
        for action in [Action::Update, Action::Delete] {
            assert!(submit(&f, action, 4).await.is_empty());
            for bad in [3, 5, 1, 0] {
                let findings = submit(&f, action, bad).await;
                assert_matches!(
                    findings.as_slice(),
                    [Finding::InvalidDocumentRevision { submitted, expected: Some(4), .. }] if *submitted == bad
                );
            }
        }
    }

    #[tokio::test]
    async fn create_collision() {
        let f = fixture();
        let findings = submit(&f, Action::Create, 0).await;
        assert_matches!(findings.as_slice(), [Finding::DocumentAlreadyPresent { document_id }] if document_id == f.stored.id());
    }

    #[tokio::test]
    async fn create_starts_at_revision_zero() {
        let f = fixture();
        let mut d = f.stored.clone();
        d.set_scope_id(crate::entropy::generate())
            .set_action(Action::Create)
            .set_revision(u64::MAX);
        let findings = check_lifecycle(&f.provider, &f.contract_id, &[d])
            .await
            .unwrap()
            .into_findings();
        assert_matches!(
            findings.as_slice(),
            [Finding::InvalidDocumentRevision { submitted: u64::MAX, expected: Some(0), .. }]
        );
    }

    #[tokio::test]
    async fn exhausted_revision_cannot_advance() {
        let f = fixture();
        let mut stored = f.stored.clone();
        stored.set_revision(u64::MAX);
        let provider = StubProvider::new().with_document(&f.contract_id, stored.clone());

        for revision in [0, u64::MAX] {
            let mut d = stored.clone();
            d.set_action(Action::Update).set_revision(revision);
            let findings = check_lifecycle(&provider, &f.contract_id, &[d])
                .await
                .unwrap()
                .into_findings();
            assert_matches!(
                findings.as_slice(),
                [Finding::InvalidDocumentRevision { expected: None, .. }]
            );
        }
    }

    #[tokio::test]
    async fn update_of_missing_document() {
        let f = fixture();
        let mut d = f.stored.clone();
        d.set_scope_id(crate::entropy::generate())
            .set_action(Action::Update)
            .set_revision(1);
        let findings = check_lifecycle(&f.provider, &f.contract_id, &[d])
            .await
            .unwrap()
            .into_findings();
        assert_matches!(findings.as_slice(), [Finding::DocumentNotFound { .. }]);
    }

    #[tokio::test]
    async fn owner_must_match() {
        let f = fixture();
        let mut raw = f.stored.to_json();
        raw["$rev"] = json!(4);
        let intruder = Document::from_json(&raw, "mallory").unwrap();
        let findings = check_lifecycle(&f.provider, &f.contract_id, &[intruder])
            .await
            .unwrap()
            .into_findings();
        assert_matches!(findings.as_slice(), [Finding::DocumentOwnerMismatch { owner, .. }] if owner == "alice");
    }

    #[tokio::test]
    async fn one_fetch_per_document_type() {
        let f = fixture();
        let mut docs = Vec::new();
        for _ in 0..3 {
            let mut d = f.stored.clone();
            d.set_scope_id(crate::entropy::generate()).set_action(Action::Create).set_revision(0);
            docs.push(d);
        }
        let mut note = Document::new("note", f.stored.scope(), crate::entropy::generate(), "alice");
        note.set("text", json!("hi")).unwrap();
        docs.push(note);

        let result = check_lifecycle(&f.provider, &f.contract_id, &docs).await.unwrap();
        assert!(result.is_valid());
        assert_eq!(f.provider.fetches(), 2);
    }

    #[tokio::test]
    async fn provider_failure_is_fatal() {
        let f = fixture();
        let provider = StubProvider::new().failing();
        assert!(check_lifecycle(&provider, &f.contract_id, &[f.stored.clone()])
            .await
            .is_err());
    }

    #[test]
    fn scope_mismatch_and_malformed_scope_id() {
        let f = fixture();
        let mut d = f.stored.clone();
        assert!(check_scope(&f.contract_id, "alice", &[d.clone()]).is_valid());

        d.set_scope("00".repeat(32)).set_scope_id("not-a-token");
        let findings = check_scope(&f.contract_id, "alice", &[d]).into_findings();
        assert_matches!(
            findings.as_slice(),
            [Finding::InvalidDocumentScope { .. }, Finding::InvalidDocumentScopeId { .. }]
        );
    }
}
