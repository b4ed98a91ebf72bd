//! Dotted-path access on open payload maps.
//!
//! Document payloads are `serde_json::Value` trees. Paths are dot-separated
//! object keys (`"address.city"`); a numeric segment indexes into an array.

use serde_json::{Map, Value};

use crate::errors::{DppError, DppResult};

/// Read a nested value by dotted path.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut cur = root;
    for seg in path.split('.') {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Write a nested value by dotted path, creating intermediate objects.
///
/// Fails if an intermediate segment exists but is neither an object nor an
/// indexable array.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> DppResult<()> {
    if path.is_empty() {
        return Err(DppError::invalid_argument("empty field path"));
    }
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| DppError::invalid_argument("empty field path"))?;

    let mut cur = root;
    for seg in parents {
        cur = step_mut(cur, seg, path)?;
    }

    match cur {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let idx = parse_index(last, path)?;
            let slot = items.get_mut(idx).ok_or_else(|| {
                DppError::invalid_argument(format!("index {idx} out of bounds in {path}"))
            })?;
            *slot = value;
            Ok(())
        }
        _ => Err(DppError::invalid_argument(format!(
            "cannot set {path}: parent is not a container"
        ))),
    }
}

/// Read a non-negative integer. Integral floats such as `3.0` count, as
/// they do for JSON-Schema `"type": "integer"`.
pub fn as_integer(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    // 2^64 is exactly representable; anything at or above it does not fit.
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < 18_446_744_073_709_551_616.0)
        .then_some(f as u64)
}

/// Remove a nested value by dotted path. Returns the removed value, if any.
pub fn remove_path(root: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((p, l)) => (get_path_mut(root, p)?, l),
        None => (root, path),
    };
    parent.as_object_mut()?.remove(last)
}

fn get_path_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut cur = root;
    for seg in path.split('.') {
        cur = match cur {
            Value::Object(map) => map.get_mut(seg)?,
            Value::Array(items) => items.get_mut(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

fn step_mut<'a>(cur: &'a mut Value, seg: &str, path: &str) -> DppResult<&'a mut Value> {
    if cur.is_null() {
        *cur = Value::Object(Map::new());
    }
    match cur {
        Value::Object(map) => Ok(map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => {
            let idx = parse_index(seg, path)?;
            items.get_mut(idx).ok_or_else(|| {
                DppError::invalid_argument(format!("index {idx} out of bounds in {path}"))
            })
        }
        _ => Err(DppError::invalid_argument(format!(
            "cannot traverse {path}: segment {seg:?} is not a container"
        ))),
    }
}

fn parse_index(seg: &str, path: &str) -> DppResult<usize> {
    seg.parse::<usize>()
        .map_err(|_| DppError::invalid_argument(format!("expected array index in {path}, got {seg:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_nested() {
        let v = json!({"a": {"b": [10, {"c": "x"}]}});
        assert_eq!(get_path(&v, "a.b.0"), Some(&json!(10)));
        assert_eq!(get_path(&v, "a.b.1.c"), Some(&json!("x")));
        assert_eq!(get_path(&v, "a.z"), None);
        assert_eq!(get_path(&v, "a.b.9"), None);
        assert_eq!(get_path(&v, ""), None);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut v = json!({});
        set_path(&mut v, "address.city", json!("Lisbon")).unwrap();
        assert_eq!(v, json!({"address": {"city": "Lisbon"}}));
    }

    #[test]
    fn set_into_array() {
        let mut v = json!({"tags": ["a", "b"]});
        set_path(&mut v, "tags.1", json!("z")).unwrap();
        assert_eq!(v, json!({"tags": ["a", "z"]}));
        assert!(set_path(&mut v, "tags.5", json!("q")).is_err());
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut v = json!({"name": "x"});
        assert!(set_path(&mut v, "name.first", json!("y")).is_err());
    }

    #[test]
    fn remove_nested() {
        let mut v = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove_path(&mut v, "a.b"), Some(json!(1)));
        assert_eq!(v, json!({"a": {"c": 2}}));
        assert_eq!(remove_path(&mut v, "a.missing"), None);
    }

    #[test]
    fn integers_include_integral_floats() {
        assert_eq!(as_integer(&json!(3)), Some(3));
        assert_eq!(as_integer(&json!(0.0)), Some(0));
        assert_eq!(as_integer(&json!(2.0)), Some(2));
        assert_eq!(as_integer(&json!(2.5)), None);
        assert_eq!(as_integer(&json!(-1)), None);
        assert_eq!(as_integer(&json!(1e20)), None);
        assert_eq!(as_integer(&json!("1")), None);
    }
}
