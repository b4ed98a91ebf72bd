//! Index definitions declared by contract document types.
//!
//! Wire form (inside a document schema):
//!
//! ```json
//! "indices": [
//!   { "properties": [{ "$userId": "asc" }, { "lastName": "asc" }], "unique": true }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::{DppError, DppResult};

/// Index field referring to the submitting identity rather than a payload field.
pub const USER_ID_FIELD: &str = "$userId";
/// Index field referring to the document id.
pub const ID_FIELD: &str = "$id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexOrder {
    Asc,
    Desc,
}

impl IndexOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn parse(s: &str) -> DppResult<Self> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(DppError::invalid_argument(format!(
                "index order must be asc or desc, got {s:?}"
            ))),
        }
    }
}

/// One field of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexProperty {
    pub name: String,
    pub order: IndexOrder,
}

/// A contract-declared index over a tuple of document fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexDefinition {
    pub properties: Vec<IndexProperty>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(properties: Vec<IndexProperty>, unique: bool) -> Self {
        Self { properties, unique }
    }

    /// Field names covered by the index, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn from_json(raw: &Value) -> DppResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| DppError::invalid_argument("index definition must be an object"))?;

        let props = obj
            .get("properties")
            .and_then(Value::as_array)
            .ok_or_else(|| DppError::invalid_argument("index.properties must be an array"))?;

        let mut properties = Vec::with_capacity(props.len());
        for (idx, p) in props.iter().enumerate() {
            let entry = p.as_object().filter(|m| m.len() == 1).ok_or_else(|| {
                DppError::invalid_argument(format!(
                    "index.properties[{idx}] must be an object with exactly one field"
                ))
            })?;
            for (name, order) in entry {
                let order = order.as_str().ok_or_else(|| {
                    DppError::invalid_argument(format!("index.properties[{idx}] order must be a string"))
                })?;
                properties.push(IndexProperty {
                    name: name.clone(),
                    order: IndexOrder::parse(order)?,
                });
            }
        }

        let unique = obj.get("unique").and_then(Value::as_bool).unwrap_or(false);

        Ok(Self { properties, unique })
    }

    pub fn to_json(&self) -> Value {
        let props: Vec<Value> = self
            .properties
            .iter()
            .map(|p| {
                let mut m = Map::new();
                m.insert(p.name.clone(), Value::String(p.order.as_str().to_string()));
                Value::Object(m)
            })
            .collect();
        json!({ "properties": props, "unique": self.unique })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render() {
        let raw = json!({
            "properties": [{"$userId": "asc"}, {"lastName": "desc"}],
            "unique": true
        });
        let idx = IndexDefinition::from_json(&raw).unwrap();
        assert!(idx.unique);
        assert_eq!(idx.field_names().collect::<Vec<_>>(), vec!["$userId", "lastName"]);
        assert_eq!(idx.properties[1].order, IndexOrder::Desc);
        assert_eq!(idx.to_json(), raw);
    }

    #[test]
    fn missing_unique_defaults_to_false() {
        let idx = IndexDefinition::from_json(&json!({"properties": [{"a": "asc"}]})).unwrap();
        assert!(!idx.unique);
    }

    #[test]
    fn malformed_property_rejected() {
        let raw = json!({"properties": [{"a": "asc", "b": "asc"}], "unique": true});
        assert!(IndexDefinition::from_json(&raw).is_err());
        let raw = json!({"properties": [{"a": "sideways"}], "unique": true});
        assert!(IndexDefinition::from_json(&raw).is_err());
    }
}
