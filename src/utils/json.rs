//! Helpers for duck-typed upstream JSON: alias lookups and an
//! order-independent canonical serialization used for change detection.

use serde_json::{Map, Value, json};

/// Scalar → string; empty strings, null, arrays and objects give `None`.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First alias whose value is a usable scalar.
pub fn pick_first_string(source: &Value, aliases: &[&str]) -> Option<String> {
    let obj = source.as_object()?;
    aliases
        .iter()
        .find_map(|key| obj.get(*key).and_then(value_as_string))
}

/// Same as [`pick_first_string`] but ignores whitespace-only values and trims.
pub fn pick_first_trimmed(source: &Value, aliases: &[&str]) -> Option<String> {
    let obj = source.as_object()?;
    aliases.iter().find_map(|key| {
        obj.get(*key)
            .and_then(value_as_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Canonical form: object keys sorted at every depth, arrays in order.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    canonical_json(a) == canonical_json(b)
}

/// Field-level diff `{field: {before, after}}` over the keys of `after`.
/// A key missing from `before` compares as `null`.
pub fn diff_snapshots(before: &Map<String, Value>, after: &Map<String, Value>) -> Map<String, Value> {
    let mut diff = Map::new();
    for (key, after_val) in after {
        let before_val = before.get(key).unwrap_or(&Value::Null);
        if !values_equal(before_val, after_val) {
            diff.insert(
                key.clone(),
                json!({ "before": before_val, "after": after_val }),
            );
        }
    }
    diff
}
