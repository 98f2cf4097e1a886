//! Dot-path helpers over nested form data.
//!
//! Paths look like `address.city` or `items.0.name`. Reads traverse objects by
//! key and arrays by numeric index; writes only ever create or descend into
//! objects.

use serde_json::{Map, Value};

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|segment| !segment.is_empty())
}

/// Returns the value at `path`, or `None` when any segment is missing, null,
/// or not traversable. An empty path yields `data` itself.
pub fn get<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at `path`, creating intermediate objects as needed.
///
/// Any non-object value met along the way (including `null` and arrays) is
/// replaced by an empty object. An empty path replaces `data` entirely.
pub fn set(data: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        *data = value;
        return;
    };

    let mut current = data;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    ensure_object(current).insert(last.to_string(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}

/// Recursively merges `overlay` into a copy of `base`.
///
/// Objects merge key by key; for every other pairing (arrays, primitives,
/// type mismatches) the overlay value wins wholesale.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let next = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => deep_clone(overlay_value),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => deep_clone(overlay),
    }
}

/// Produces an independent copy of `value`; nothing is shared with the input.
pub fn deep_clone(value: &Value) -> Value {
    value.clone()
}

/// Joins a parent path and a child segment with a dot, skipping empty parts.
pub fn join(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{parent}.{child}"),
    }
}
