use super::*;
use serde_json::json;

#[test]
fn test_valid_object() {
    let schema = json!({
        "type": "object",
        "properties": {
            "query": {"type": "string"},
            "limit": {"type": "integer"}
        },
        "required": ["query"]
    });
    let value = json!({"query": "rust", "limit": 5});
    assert!(validate_against_schema(&value, &schema).is_valid());
}

#[test]
fn test_missing_required_field() {
    let schema = json!({
        "type": "object",
        "properties": {"query": {"type": "string"}},
        "required": ["query"]
    });
    let result = validate_against_schema(&json!({}), &schema);
    match result {
        ValidationResult::Invalid { errors } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].path.as_deref(), Some("query"));
            assert!(errors[0].message.contains("missing required field"));
        }
        ValidationResult::Valid => panic!("Expected Invalid result"),
    }
}

#[test]
fn test_type_mismatch_reports_found_type() {
    let schema = json!({"type": "object", "properties": {"count": {"type": "integer"}}});
    let result = validate_against_schema(&json!({"count": "three"}), &schema);
    match result {
        ValidationResult::Invalid { errors } => {
            assert_eq!(errors[0].path.as_deref(), Some("count"));
            assert!(errors[0].message.contains("expected integer, found string"));
        }
        ValidationResult::Valid => panic!("Expected Invalid result"),
    }
}

#[test]
fn test_root_type_mismatch() {
    let schema = json!({"type": "object"});
    let result = validate_against_schema(&json!("not an object"), &schema);
    match result {
        ValidationResult::Invalid { errors } => {
            assert!(errors[0].path.is_none());
            assert!(errors[0].message.contains("expected object"));
        }
        ValidationResult::Valid => panic!("Expected Invalid result"),
    }
}

#[test]
fn test_nested_properties_and_paths() {
    let schema = json!({
        "type": "object",
        "properties": {
            "filters": {
                "type": "object",
                "properties": {"max_age": {"type": "integer"}},
                "required": ["max_age"]
            }
        }
    });
    let result = validate_against_schema(&json!({"filters": {}}), &schema);
    match result {
        ValidationResult::Invalid { errors } => {
            assert_eq!(errors[0].path.as_deref(), Some("filters.max_age"));
        }
        ValidationResult::Valid => panic!("Expected Invalid result"),
    }
}

#[test]
fn test_array_items() {
    let schema = json!({
        "type": "array",
        "items": {"type": "string"}
    });
    assert!(validate_against_schema(&json!(["a", "b"]), &schema).is_valid());

    let result = validate_against_schema(&json!(["a", 2]), &schema);
    match result {
        ValidationResult::Invalid { errors } => {
            assert_eq!(errors[0].path.as_deref(), Some("[1]"));
        }
        ValidationResult::Valid => panic!("Expected Invalid result"),
    }
}

#[test]
fn test_enum_values() {
    let schema = json!({"enum": ["low", "high"]});
    assert!(validate_against_schema(&json!("low"), &schema).is_valid());
    assert!(!validate_against_schema(&json!("medium"), &schema).is_valid());
}

#[test]
fn test_type_list() {
    let schema = json!({"type": ["string", "null"]});
    assert!(validate_against_schema(&json!("x"), &schema).is_valid());
    assert!(validate_against_schema(&json!(null), &schema).is_valid());
    assert!(!validate_against_schema(&json!(4), &schema).is_valid());
}

#[test]
fn test_multiple_errors_reported() {
    let schema = json!({
        "type": "object",
        "properties": {
            "a": {"type": "string"},
            "b": {"type": "integer"}
        },
        "required": ["a", "b", "c"]
    });
    let result = validate_against_schema(&json!({"a": 1, "b": "x"}), &schema);
    match result {
        ValidationResult::Invalid { errors } => {
            // Two type mismatches plus one missing field.
            assert_eq!(errors.len(), 3);
        }
        ValidationResult::Valid => panic!("Expected Invalid result"),
    }
}

#[test]
fn test_unknown_keywords_ignored() {
    let schema = json!({
        "type": "object",
        "additionalProperties": false,
        "minProperties": 10
    });
    // Keywords outside the supported subset do not reject values.
    assert!(validate_against_schema(&json!({"extra": 1}), &schema).is_valid());
}
