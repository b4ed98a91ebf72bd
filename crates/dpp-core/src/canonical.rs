//! Canonical CBOR encoding for DPP documents, contracts and packets.
//!
//! Canonical form rules:
//! - map keys are text and are ordered length-first, then bytewise
//!   (RFC 7049 §3.9 canonical ordering)
//! - integers use the shortest CBOR encoding (ciborium default)
//! - non-integral numbers are encoded as floats
//!
//! The decoded form is a plain `serde_json::Value`. CBOR features that have
//! no JSON counterpart (byte strings, tags, non-text keys) are rejected on
//! decode.

use std::cmp::Ordering;

use ciborium::value::{Integer, Value as CborValue};
use serde_json::{Map, Number, Value};

use crate::errors::{DppError, DppResult};

/// Hard ceiling for document and contract encodings.
pub const MAX_ENCODED_BYTES: usize = 16 * 1024;

/// Canonical key ordering: shorter keys first, ties broken bytewise.
pub fn canonical_key_cmp(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

/// Encode a JSON value to canonical CBOR bytes without a size ceiling.
pub fn encode(value: &Value) -> DppResult<Vec<u8>> {
    let cbor = to_cbor(value)?;
    let mut out = Vec::new();
    ciborium::ser::into_writer(&cbor, &mut out)
        .map_err(|e| DppError::serialization(format!("cbor encode failed: {e}")))?;
    Ok(out)
}

/// Encode a JSON value to canonical CBOR bytes, failing if the result exceeds `max_bytes`.
pub fn encode_with_limit(value: &Value, max_bytes: usize) -> DppResult<Vec<u8>> {
    let out = encode(value)?;
    if out.len() > max_bytes {
        return Err(DppError::PayloadTooLarge {
            size: out.len(),
            max: max_bytes,
        });
    }
    Ok(out)
}

/// Decode canonical CBOR bytes into a JSON value.
pub fn decode(bytes: &[u8]) -> DppResult<Value> {
    let cbor: CborValue = ciborium::de::from_reader(bytes)
        .map_err(|e| DppError::serialization(format!("cbor decode failed: {e}")))?;
    from_cbor(cbor)
}

fn to_cbor(value: &Value) -> DppResult<CborValue> {
    Ok(match value {
        Value::Null => CborValue::Null,
        Value::Bool(b) => CborValue::Bool(*b),
        Value::Number(n) => number_to_cbor(n)?,
        Value::String(s) => CborValue::Text(s.clone()),
        Value::Array(items) => {
            CborValue::Array(items.iter().map(to_cbor).collect::<DppResult<_>>()?)
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| canonical_key_cmp(a, b));

            let mut entries = Vec::with_capacity(keys.len());
            for k in keys {
                entries.push((CborValue::Text(k.clone()), to_cbor(&map[k.as_str()])?));
            }
            CborValue::Map(entries)
        }
    })
}

fn number_to_cbor(n: &Number) -> DppResult<CborValue> {
    if let Some(u) = n.as_u64() {
        return Ok(CborValue::Integer(Integer::from(u)));
    }
    if let Some(i) = n.as_i64() {
        return Ok(CborValue::Integer(Integer::from(i)));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => Ok(CborValue::Float(f)),
        _ => Err(DppError::serialization(format!("non-finite number: {n}"))),
    }
}

fn from_cbor(value: CborValue) -> DppResult<Value> {
    Ok(match value {
        CborValue::Null => Value::Null,
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Integer(i) => {
            let wide = i128::from(i);
            if let Ok(u) = u64::try_from(wide) {
                Value::Number(u.into())
            } else if let Ok(s) = i64::try_from(wide) {
                Value::Number(s.into())
            } else {
                return Err(DppError::serialization(format!(
                    "integer out of range: {wide}"
                )));
            }
        }
        CborValue::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| DppError::serialization("non-finite float"))?,
        CborValue::Text(s) => Value::String(s),
        CborValue::Array(items) => {
            Value::Array(items.into_iter().map(from_cbor).collect::<DppResult<_>>()?)
        }
        CborValue::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                let key = match k {
                    CborValue::Text(s) => s,
                    other => {
                        return Err(DppError::serialization(format!(
                            "map keys must be text, got {other:?}"
                        )))
                    }
                };
                if map.insert(key.clone(), from_cbor(v)?).is_some() {
                    return Err(DppError::serialization(format!("duplicate map key: {key}")));
                }
            }
            Value::Object(map)
        }
        CborValue::Bytes(_) => {
            return Err(DppError::serialization("byte strings are not supported"))
        }
        CborValue::Tag(tag, _) => {
            return Err(DppError::serialization(format!("unsupported cbor tag: {tag}")))
        }
        other => {
            return Err(DppError::serialization(format!(
                "unsupported cbor value: {other:?}"
            )))
        }
    })
}
