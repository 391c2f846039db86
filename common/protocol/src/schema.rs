//! Lightweight JSON schema validation.
//!
//! The runtime validates agent params, tool inputs, and structured outputs
//! against declared schemas. This module implements the subset of JSON Schema
//! those declarations actually use: `type`, `required`, `properties`, `items`,
//! and `enum`. Unknown keywords are ignored rather than rejected, so schemas
//! written for full validators still work here.

use serde_json::Value;

use crate::tool_types::ValidationError;
use crate::tool_types::ValidationResult;

/// Validate a value against a schema.
///
/// Returns every violation found, not just the first, so callers can surface
/// a complete report in one pass.
pub fn validate_against_schema(value: &Value, schema: &Value) -> ValidationResult {
    let mut errors = Vec::new();
    check_value(value, schema, "", &mut errors);
    if errors.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid { errors }
    }
}

fn check_value(value: &Value, schema: &Value, path: &str, errors: &mut Vec<ValidationError>) {
    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            push_error(errors, path, format!("value {value} is not one of the allowed values"));
            return;
        }
    }

    if let Some(type_spec) = schema.get("type") {
        if !type_spec_matches(type_spec, value) {
            let expected = render_type_spec(type_spec);
            let found = json_type_name(value);
            push_error(errors, path, format!("expected {expected}, found {found}"));
            return;
        }
    }

    if let Some(obj) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(field) {
                    push_error(
                        errors,
                        &child_path(path, field),
                        format!("missing required field '{field}'"),
                    );
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, subschema) in properties {
                if let Some(field_value) = obj.get(name) {
                    check_value(field_value, subschema, &child_path(path, name), errors);
                }
            }
        }
    }

    if let (Some(items), Some(array)) = (schema.get("items"), value.as_array()) {
        for (index, item) in array.iter().enumerate() {
            check_value(item, items, &format!("{path}[{index}]"), errors);
        }
    }
}

/// Check a `type` keyword, which may be a single name or a list of names.
fn type_spec_matches(type_spec: &Value, value: &Value) -> bool {
    match type_spec {
        Value::String(name) => type_name_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_name_matches(name, value)),
        _ => true,
    }
}

fn type_name_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        // Unknown type keyword, skip rather than reject.
        _ => true,
    }
}

fn render_type_spec(type_spec: &Value) -> String {
    match type_spec {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

/// The JSON type name of a value, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn push_error(errors: &mut Vec<ValidationError>, path: &str, message: String) {
    if path.is_empty() {
        errors.push(ValidationError::new(message));
    } else {
        errors.push(ValidationError::with_path(message, path));
    }
}

#[cfg(test)]
#[path = "schema.test.rs"]
mod tests;
