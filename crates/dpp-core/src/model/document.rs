//! Document model.
//!
//! A document is one owner-scoped unit of contract-governed state. System
//! fields travel with a `$` prefix next to the open payload:
//!
//! ```json
//! { "$type": "person", "$scope": "<hex>", "$scopeId": "<token>",
//!   "$rev": 0, "$action": 1, "lastName": "Birkin" }
//! ```
//!
//! Derived identifiers:
//! - `scope = H(contractId ‖ userId)`
//! - `id    = H(scope ‖ scopeId)`, computed lazily and cached

use std::fmt;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::errors::{DppError, DppResult};

pub const PROPERTY_TYPE: &str = "$type";
pub const PROPERTY_SCOPE: &str = "$scope";
pub const PROPERTY_SCOPE_ID: &str = "$scopeId";
pub const PROPERTY_REVISION: &str = "$rev";
pub const PROPERTY_ACTION: &str = "$action";

/// System fields carried by every document, in wire order.
pub const SYSTEM_PROPERTIES: [&str; 5] = [
    PROPERTY_TYPE,
    PROPERTY_SCOPE,
    PROPERTY_SCOPE_ID,
    PROPERTY_REVISION,
    PROPERTY_ACTION,
];

/// Document operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn code(&self) -> u64 {
        match self {
            Self::Create => 1,
            Self::Update => 2,
            Self::Delete => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl TryFrom<u64> for Action {
    type Error = DppError;

    fn try_from(code: u64) -> DppResult<Self> {
        match code {
            1 => Ok(Self::Create),
            2 => Ok(Self::Update),
            3 => Ok(Self::Delete),
            other => Err(DppError::UnknownAction(other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute a document scope.
pub fn compute_scope(contract_id: &str, user_id: &str) -> String {
    crate::hash::hash_concat_hex(&[contract_id, user_id])
}

/// Compute a document id.
pub fn compute_id(scope: &str, scope_id: &str) -> String {
    crate::hash::hash_concat_hex(&[scope, scope_id])
}

#[derive(Debug, Clone)]
pub struct Document {
    doc_type: String,
    scope: String,
    scope_id: String,
    revision: u64,
    action: Action,
    payload: Map<String, Value>,
    /// Submitting identity. Known from the factory, never serialized.
    user_id: String,
    id: OnceLock<String>,
}

impl Document {
    pub fn new(
        doc_type: impl Into<String>,
        scope: impl Into<String>,
        scope_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            doc_type: doc_type.into(),
            scope: scope.into(),
            scope_id: scope_id.into(),
            revision: 0,
            action: Action::Create,
            payload: Map::new(),
            user_id: user_id.into(),
            id: OnceLock::new(),
        }
    }

    /// Decode a document from its keyed JSON form.
    ///
    /// Malformed system fields are fatal here; callers that need findings
    /// run [`crate::schema::DocumentValidator::validate_raw`] first.
    pub fn from_json(raw: &Value, user_id: impl Into<String>) -> DppResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| DppError::invalid_argument("document must be an object"))?;

        let text = |key: &str| -> DppResult<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| DppError::invalid_argument(format!("document {key} must be a string")))
        };
        let integer = |key: &str| -> DppResult<u64> {
            obj.get(key).and_then(crate::value::as_integer).ok_or_else(|| {
                DppError::invalid_argument(format!("document {key} must be a non-negative integer"))
            })
        };

        let action = Action::try_from(integer(PROPERTY_ACTION)?)?;

        let payload = obj
            .iter()
            .filter(|(k, _)| !SYSTEM_PROPERTIES.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            doc_type: text(PROPERTY_TYPE)?,
            scope: text(PROPERTY_SCOPE)?,
            scope_id: text(PROPERTY_SCOPE_ID)?,
            revision: integer(PROPERTY_REVISION)?,
            action,
            payload,
            user_id: user_id.into(),
            id: OnceLock::new(),
        })
    }

    pub fn to_json(&self) -> Value {
        let mut obj = self.payload.clone();
        obj.insert(PROPERTY_TYPE.to_string(), Value::String(self.doc_type.clone()));
        obj.insert(PROPERTY_SCOPE.to_string(), Value::String(self.scope.clone()));
        obj.insert(PROPERTY_SCOPE_ID.to_string(), Value::String(self.scope_id.clone()));
        obj.insert(PROPERTY_REVISION.to_string(), Value::from(self.revision));
        obj.insert(PROPERTY_ACTION.to_string(), Value::from(self.action.code()));
        Value::Object(obj)
    }

    /// Canonical CBOR bytes, subject to the encoding ceiling.
    pub fn encode(&self) -> DppResult<Vec<u8>> {
        crate::canonical::encode_with_limit(&self.to_json(), crate::canonical::MAX_ENCODED_BYTES)
    }

    pub fn decode(bytes: &[u8], user_id: impl Into<String>) -> DppResult<Self> {
        Self::from_json(&crate::canonical::decode(bytes)?, user_id)
    }

    /// Content-derived id, computed once and cached.
    pub fn id(&self) -> &str {
        self.id
            .get_or_init(|| compute_id(&self.scope, &self.scope_id))
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn set_scope(&mut self, scope: impl Into<String>) -> &mut Self {
        self.scope = scope.into();
        self.id = OnceLock::new();
        self
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn set_scope_id(&mut self, scope_id: impl Into<String>) -> &mut Self {
        self.scope_id = scope_id.into();
        self.id = OnceLock::new();
        self
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_revision(&mut self, revision: u64) -> &mut Self {
        self.revision = revision;
        self
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn set_action(&mut self, action: Action) -> &mut Self {
        self.action = action;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Map<String, Value>) -> &mut Self {
        self.payload = payload;
        self
    }

    /// Read a payload field by dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (path, None),
        };
        let top = self.payload.get(head)?;
        match rest {
            Some(rest) => crate::value::get_path(top, rest),
            None => Some(top),
        }
    }

    /// Write a payload field by dotted path.
    pub fn set(&mut self, path: &str, value: Value) -> DppResult<&mut Self> {
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (path, None),
        };
        if head.is_empty() || SYSTEM_PROPERTIES.contains(&head) {
            return Err(DppError::invalid_argument(format!(
                "{path} is not a payload field"
            )));
        }
        match rest {
            Some(rest) => {
                let slot = self
                    .payload
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                crate::value::set_path(slot, rest, value)?;
            }
            None => {
                self.payload.insert(head.to_string(), value);
            }
        }
        Ok(self)
    }

    /// Value of an index field: `$userId`, `$id`, or a payload path.
    pub fn index_value(&self, field: &str) -> Option<Value> {
        match field {
            crate::model::index::USER_ID_FIELD => Some(Value::String(self.user_id.clone())),
            crate::model::index::ID_FIELD => Some(Value::String(self.id().to_string())),
            other => self.get(other).cloned(),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.doc_type == other.doc_type
            && self.scope == other.scope
            && self.scope_id == other.scope_id
            && self.revision == other.revision
            && self.action == other.action
            && self.payload == other.payload
            && self.user_id == other.user_id
    }
}
