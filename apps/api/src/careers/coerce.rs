//! Field-by-field coercion of untrusted JSON (model output and client bodies).
//! Nothing here fails: wrong shapes become `None` or an empty list.

use serde_json::Value;

/// Text content of a scalar: trimmed strings, numbers and bools rendered as text.
/// Empty strings count as absent.
pub fn text(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!rendered.is_empty()).then_some(rendered)
}

/// The first of `keys` present on `object` with usable text.
pub fn field_text(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(text))
}

/// A list of non-empty strings. Accepts an array (non-text items skipped)
/// or a single comma-separated string.
pub fn text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Like `text_list`, reading the first of `keys` that holds a list.
pub fn field_list(object: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .map(text_list)
        .find(|list| !list.is_empty())
        .unwrap_or_default()
}

/// A number, or a numeric string such as `"0.85"` or `"85%"`.
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}
