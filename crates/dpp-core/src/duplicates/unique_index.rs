//! Unique-index duplicates.
//!
//! A document collides on a unique index when every field of the index has
//! the same value as in another document of the same type. Deletions are
//! never checked, and a document missing any field of an index is not a
//! duplicate for that index.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::errors::DppResult;
use crate::findings::{DuplicateSource, Finding, ValidationResult};
use crate::model::contract::Contract;
use crate::model::document::{Action, Document};
use crate::model::index::IndexDefinition;
use crate::provider::{DataProvider, DocumentQuery};

/// Values of `index`'s fields for `document`, or `None` if any is missing.
pub fn index_tuple(document: &Document, index: &IndexDefinition) -> Option<Vec<Value>> {
    index
        .field_names()
        .map(|field| document.index_value(field))
        .collect()
}

/// Documents eligible for unique-index checks, paired with each unique
/// index of their type for which their tuple is complete.
fn candidates<'a>(
    contract: &Contract,
    documents: &'a [Document],
) -> Vec<(&'a Document, IndexDefinition, Vec<Value>)> {
    let mut out = Vec::new();
    for document in documents {
        if document.action() == Action::Delete {
            continue;
        }
        // Undefined types are reported by the structure stage.
        let Ok(indices) = contract.unique_indices(document.doc_type()) else {
            continue;
        };
        for index in indices {
            if let Some(tuple) = index_tuple(document, &index) {
                out.push((document, index, tuple));
            }
        }
    }
    out
}

/// Collisions between documents of the same packet.
///
/// One finding per colliding group, tagged with the matching index.
pub fn find_in_packet(contract: &Contract, documents: &[Document]) -> ValidationResult {
    // Tuples are keyed by their JSON text; serde_json maps render in key order.
    let mut groups: BTreeMap<(String, IndexDefinitionKey, String), Vec<(usize, &Document)>> =
        BTreeMap::new();
    let mut index_defs: BTreeMap<IndexDefinitionKey, IndexDefinition> = BTreeMap::new();

    for (pos, (document, index, tuple)) in candidates(contract, documents).into_iter().enumerate() {
        let key = IndexDefinitionKey::of(&index);
        index_defs.entry(key.clone()).or_insert(index);
        let tuple_key = Value::Array(tuple).to_string();
        groups
            .entry((document.doc_type().to_string(), key, tuple_key))
            .or_default()
            .push((pos, document));
    }

    let mut collisions: Vec<_> = groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .collect();
    collisions.sort_by_key(|(_, members)| members[0].0);

    collisions
        .into_iter()
        .filter_map(|((document_type, key, _), members)| {
            let index = index_defs.get(&key)?.clone();
            Some(Finding::DuplicateDocumentsByIndex {
                document_type,
                index,
                documents: members.iter().map(|(_, d)| d.to_json()).collect(),
                origin: DuplicateSource::Packet,
            })
        })
        .collect()
}

/// Collisions with persisted documents.
///
/// One lookup per `(document, unique index)` pair, excluding the document's
/// own id. Lookups run concurrently and are joined in input order.
pub async fn find_persisted(
    provider: &dyn DataProvider,
    contract_id: &str,
    contract: &Contract,
    documents: &[Document],
) -> DppResult<ValidationResult> {
    let lookups = candidates(contract, documents);
    debug!(lookups = lookups.len(), "unique index lookups");

    let fetched = try_join_all(lookups.iter().map(|(document, index, tuple)| {
        let query = index
            .field_names()
            .zip(tuple.iter())
            .fold(DocumentQuery::new(), |q, (field, value)| q.equal(field, value.clone()))
            .id_not_in(vec![document.id().to_string()]);
        async move {
            provider
                .fetch_documents(contract_id, document.doc_type(), &query)
                .await
        }
    }))
    .await?;

    Ok(lookups
        .into_iter()
        .zip(fetched)
        .filter(|(_, matches)| !matches.is_empty())
        .map(|((document, index, _), _)| Finding::DuplicateDocumentsByIndex {
            document_type: document.doc_type().to_string(),
            index,
            documents: vec![document.to_json()],
            origin: DuplicateSource::Persisted,
        })
        .collect())
}

/// Orderable identity of an index definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct IndexDefinitionKey(Vec<(String, &'static str)>);

impl IndexDefinitionKey {
    fn of(index: &IndexDefinition) -> Self {
        Self(
            index
                .properties
                .iter()
                .map(|p| (p.name.clone(), p.order.as_str()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::compute_scope;
    use crate::test_support::{StubProvider, people_contract};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn person(contract: &Contract, user: &str, last_name: &str) -> Document {
        let mut d = Document::new(
            "person",
            compute_scope(&contract.id().unwrap(), user),
            crate::entropy::generate(),
            user,
        );
        d.set("lastName", json!(last_name)).unwrap();
        d
    }

    #[test]
    fn same_owner_same_last_name_collides() {
        let c = people_contract();
        let a = person(&c, "alice", "Birkin");
        let b = person(&c, "alice", "Birkin");
        let findings = find_in_packet(&c, &[a.clone(), b.clone()]).into_findings();
        assert_eq!(findings.len(), 1);
        assert_matches!(&findings[0], Finding::DuplicateDocumentsByIndex { index, documents, origin, .. } => {
            assert_eq!(index.field_names().collect::<Vec<_>>(), vec!["$userId", "lastName"]);
            assert_eq!(documents, &vec![a.to_json(), b.to_json()]);
            assert_eq!(*origin, DuplicateSource::Packet);
        });
    }

    #[test]
    fn different_owners_do_not_collide() {
        let c = people_contract();
        let docs = [person(&c, "alice", "Birkin"), person(&c, "bob", "Birkin")];
        assert!(find_in_packet(&c, &docs).is_valid());
    }

    #[test]
    fn deletes_and_incomplete_tuples_are_ignored() {
        let c = people_contract();
        let a = person(&c, "alice", "Birkin");
        let mut b = person(&c, "alice", "Birkin");
        b.set_action(Action::Delete);
        let mut incomplete = Document::new("person", a.scope(), crate::entropy::generate(), "alice");
        incomplete.set("firstName", json!("Jane")).unwrap();
        let mut incomplete2 = incomplete.clone();
        incomplete2.set_scope_id(crate::entropy::generate());
        assert!(find_in_packet(&c, &[a, b, incomplete, incomplete2]).is_valid());
    }

    #[test]
    fn one_finding_per_matching_index() {
        let c = people_contract();
        let mut a = person(&c, "alice", "Birkin");
        a.set("email", json!("jane@example.com")).unwrap();
        let mut b = person(&c, "alice", "Birkin");
        b.set("email", json!("jane@example.com")).unwrap();
        let findings = find_in_packet(&c, &[a, b]).into_findings();
        assert_eq!(findings.len(), 2);
    }

    #[tokio::test]
    async fn persisted_collision_flags_originating_document() {
        let c = people_contract();
        let id = c.id().unwrap();
        let stored = person(&c, "alice", "Birkin");
        let provider = StubProvider::new().with_contract(c.clone()).with_document(&id, stored.clone());

        let incoming = person(&c, "alice", "Birkin");
        let other = person(&c, "alice", "Gainsbourg");
        let result = find_persisted(&provider, &id, &c, &[incoming.clone(), other])
            .await
            .unwrap();
        let findings = result.into_findings();
        assert_eq!(findings.len(), 1);
        assert_matches!(&findings[0], Finding::DuplicateDocumentsByIndex { documents, origin, .. } => {
            assert_eq!(documents, &vec![incoming.to_json()]);
            assert_eq!(*origin, DuplicateSource::Persisted);
        });
    }

    #[tokio::test]
    async fn own_persisted_copy_is_excluded() {
        let c = people_contract();
        let id = c.id().unwrap();
        let stored = person(&c, "alice", "Birkin");
        let provider = StubProvider::new().with_document(&id, stored.clone());

        let mut update = stored.clone();
        update.set_action(Action::Update).set_revision(1);
        assert!(find_persisted(&provider, &id, &c, &[update]).await.unwrap().is_valid());
    }
}
