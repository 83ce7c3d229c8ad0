//! State-shaping operations: `generateContext`, `composeResult`,
//! `validateOutput`, and the composition transforms.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::directive::Transform;

/// `generateContext`: merge the referenced state entries into a single
/// context object tagged with `args.type`.
pub fn generate_context(args: &Map<String, Value>, inputs: &[(String, Value)]) -> Value {
    let context_type = args.get("type").and_then(Value::as_str).unwrap_or("general");
    let mut merged = Map::new();
    for (key, value) in inputs {
        merged.insert(key.clone(), value.clone());
    }
    json!({
        "type": context_type,
        "inputCount": inputs.len(),
        "context": merged,
    })
}

/// `composeResult`: summarize the accumulated state store.
pub fn compose_result(args: &Map<String, Value>, state: &IndexMap<String, Value>) -> Value {
    let template = args
        .get("template")
        .and_then(Value::as_str)
        .unwrap_or("default");
    let format = args.get("format").and_then(Value::as_str).unwrap_or("json");

    let mut summary = Map::new();
    for (key, value) in state {
        summary.insert(key.clone(), json!(json_type_name(value)));
    }

    json!({
        "template": template,
        "format": format,
        "keys": state.keys().cloned().collect::<Vec<_>>(),
        "summary": summary,
    })
}

/// `validateOutput`: an input is valid when it resolved to a non-null
/// value.
pub fn validate_output(input: Option<&Value>) -> Value {
    let valid = matches!(input, Some(value) if !value.is_null());
    json!({"valid": valid})
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const SUMMARIZE_SAMPLE: usize = 3;
const SUMMARIZE_STRING_MAX: usize = 200;

/// Apply a named composition transform to a section's source value.
///
/// Transforms are deterministic data-shape reductions:
/// - `summarize`: arrays become `{count, sample}`, objects `{keys, count}`,
///   long strings are truncated
/// - `extract`: keep scalar members of objects/arrays
/// - `format`: pretty-print the value as a string
/// - `filter`: drop null (and empty-string) members
pub fn apply_transform(transform: Option<Transform>, value: &Value) -> Value {
    match transform {
        None => value.clone(),
        Some(Transform::Summarize) => summarize(value),
        Some(Transform::Extract) => extract(value),
        Some(Transform::Format) => format_value(value),
        Some(Transform::Filter) => filter(value),
    }
}

fn summarize(value: &Value) -> Value {
    match value {
        Value::Array(items) => json!({
            "count": items.len(),
            "sample": items.iter().take(SUMMARIZE_SAMPLE).cloned().collect::<Vec<_>>(),
        }),
        Value::Object(map) => json!({
            "keys": map.keys().cloned().collect::<Vec<_>>(),
            "count": map.len(),
        }),
        Value::String(s) if s.chars().count() > SUMMARIZE_STRING_MAX => {
            let truncated: String = s.chars().take(SUMMARIZE_STRING_MAX).collect();
            Value::String(format!("{truncated}..."))
        }
        other => other.clone(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn extract(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| is_scalar(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().filter(|v| is_scalar(v)).cloned().collect())
        }
        other => other.clone(),
    }
}

fn format_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.clone()),
        other => match serde_json::to_string_pretty(other) {
            Ok(pretty) => Value::String(pretty),
            Err(_) => Value::String(other.to_string()),
        },
    }
}

fn empty_or_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn filter(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().filter(|v| !empty_or_null(v)).cloned().collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !empty_or_null(v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
