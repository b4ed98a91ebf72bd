//! Contract and document structural validators.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use super::{enrich_contract, meta, validate_with, SchemaEngine};
use crate::config::CoreConfig;
use crate::errors::{DppError, DppResult};
use crate::findings::{Finding, ValidationResult};
use crate::model::contract::Contract;
use crate::model::document::{Action, PROPERTY_ACTION, PROPERTY_TYPE};
use crate::model::index::{IndexDefinition, ID_FIELD, USER_ID_FIELD};

/// Validates contracts against the meta-schema plus index rules.
#[derive(Clone)]
pub struct ContractValidator {
    engine: Arc<dyn SchemaEngine>,
    config: CoreConfig,
}

impl ContractValidator {
    pub fn new(engine: Arc<dyn SchemaEngine>, config: CoreConfig) -> Self {
        Self { engine, config }
    }

    pub fn validate(&self, contract: &Contract) -> DppResult<ValidationResult> {
        self.validate_raw(&contract.to_json()?)
    }

    /// Validate a contract's keyed JSON form.
    ///
    /// Index rules are checked only once the meta-schema passes, since they
    /// rely on the shape it guarantees.
    pub fn validate_raw(&self, raw: &Value) -> DppResult<ValidationResult> {
        let mut result = ValidationResult::new();

        let meta_schema = meta::contract_meta_schema(&self.config);
        result.extend(self.engine.validate(&meta_schema, raw)?);
        if !result.is_valid() {
            return Ok(result);
        }

        let documents = raw
            .get("documents")
            .and_then(Value::as_object)
            .ok_or_else(|| DppError::invariant("meta-schema admitted contract without documents"))?;

        for (doc_type, schema) in documents {
            result.merge(self.validate_indices(doc_type, schema)?);
        }

        Ok(result)
    }

    fn validate_indices(&self, doc_type: &str, schema: &Value) -> DppResult<ValidationResult> {
        let mut result = ValidationResult::new();

        let Some(raw_indices) = schema.get("indices").and_then(Value::as_array) else {
            return Ok(result);
        };
        let indices = raw_indices
            .iter()
            .map(IndexDefinition::from_json)
            .collect::<DppResult<Vec<_>>>()?;

        let defined = schema.get("properties").and_then(Value::as_object);

        let mut seen: BTreeSet<Vec<&str>> = BTreeSet::new();
        for index in &indices {
            let fields: Vec<&str> = index.field_names().collect();

            if !seen.insert(fields.clone()) {
                result.push(Finding::DuplicateIndex {
                    document_type: doc_type.to_string(),
                    index: index.clone(),
                });
            }

            if index.unique
                && self.config.validation.require_user_id_index_prefix
                && fields.first() != Some(&USER_ID_FIELD)
            {
                result.push(Finding::UniqueIndexMustHaveUserIdPrefix {
                    document_type: doc_type.to_string(),
                    index: index.clone(),
                });
            }

            for field in fields {
                if field == USER_ID_FIELD || field == ID_FIELD {
                    continue;
                }
                let top = field.split('.').next().unwrap_or(field);
                if !defined.is_some_and(|d| d.contains_key(top)) {
                    result.push(Finding::UndefinedIndexProperty {
                        document_type: doc_type.to_string(),
                        property: field.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }
}

/// Validates raw documents against their contract's enriched schemas.
#[derive(Clone)]
pub struct DocumentValidator {
    engine: Arc<dyn SchemaEngine>,
}

impl DocumentValidator {
    pub fn new(engine: Arc<dyn SchemaEngine>) -> Self {
        Self { engine }
    }

    /// Validate one raw document.
    ///
    /// Deletes are checked against the system fields only; creates and
    /// updates against the full enriched type schema. An integer `$action`
    /// outside the known set is fatal.
    pub fn validate_raw(&self, raw: &Value, contract: &Contract) -> DppResult<ValidationResult> {
        let mut result = ValidationResult::new();
        let action = read_action(raw)?;

        let Some(doc_type) = raw.get(PROPERTY_TYPE).and_then(Value::as_str) else {
            result.push(Finding::MissingDocumentType {
                document: raw.clone(),
            });
            return Ok(result);
        };

        if !contract.is_document_defined(doc_type) {
            result.push(Finding::InvalidDocumentType {
                document_type: doc_type.to_string(),
                contract_id: contract.id()?,
            });
            return Ok(result);
        }

        if raw.get(PROPERTY_ACTION).is_none() {
            result.push(Finding::MissingDocumentAction {
                document: raw.clone(),
            });
            return Ok(result);
        }

        let violations = match action {
            Some(Action::Delete) => self.engine.validate(&meta::document_base_schema(), raw)?,
            _ => {
                let schema = contract.document_schema_ref(doc_type)?;
                let enriched = enrich_contract(contract)?;
                validate_with(
                    self.engine.as_ref(),
                    &schema,
                    raw,
                    vec![(contract.schema_uri()?, enriched)],
                )?
            }
        };
        result.extend(violations);

        Ok(result)
    }

    /// Validate system fields only, for documents whose contract is unknown.
    pub fn validate_system_fields(&self, raw: &Value) -> DppResult<ValidationResult> {
        read_action(raw)?;
        let mut result = ValidationResult::new();
        result.extend(self.engine.validate(&meta::document_base_schema(), raw)?);
        Ok(result)
    }
}

/// The document's action, if `$action` holds an integer. Unknown codes are
/// fatal; anything that is not an integer is left to the schema.
fn read_action(raw: &Value) -> DppResult<Option<Action>> {
    raw.get(PROPERTY_ACTION)
        .and_then(crate::value::as_integer)
        .map(Action::try_from)
        .transpose()
}
