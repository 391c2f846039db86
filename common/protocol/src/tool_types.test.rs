use super::*;

#[test]
fn test_concurrency_safety_default() {
    assert_eq!(ConcurrencySafety::default(), ConcurrencySafety::Safe);
    assert!(ConcurrencySafety::Safe.is_safe());
    assert!(!ConcurrencySafety::Unsafe.is_safe());
}

#[test]
fn test_tool_definition_constructors() {
    let bare = ToolDefinition::new("lookup", serde_json::json!({"type": "object"}));
    assert_eq!(bare.name, "lookup");
    assert!(bare.description.is_none());

    let full = ToolDefinition::full("lookup", "Look up a record", serde_json::json!({}));
    assert_eq!(full.description.as_deref(), Some("Look up a record"));
}

#[test]
fn test_tool_call_parse_arguments() {
    #[derive(serde::Deserialize)]
    struct Args {
        key: String,
    }

    let call = ToolCall::new("c1", "lookup", serde_json::json!({"key": "alpha"}));
    let args: Args = call.parse_arguments().unwrap();
    assert_eq!(args.key, "alpha");

    let bad = ToolCall::new("c2", "lookup", serde_json::json!({"key": 7}));
    assert!(bad.parse_arguments::<Args>().is_err());
}

#[test]
fn test_tool_output_constructors() {
    let text = ToolOutput::text("Hello");
    assert!(!text.is_error);
    assert!(text.modifiers.is_empty());

    let error = ToolOutput::error("Something went wrong");
    assert!(error.is_error);

    let structured = ToolOutput::structured(serde_json::json!({"key": "value"}));
    assert!(!structured.is_error);
}

#[test]
fn test_tool_output_with_modifiers() {
    let output = ToolOutput::text("recorded")
        .with_modifier(RunModifier::SetOutput {
            value: serde_json::json!({"done": true}),
        })
        .with_modifier(RunModifier::ReplaceMessages {
            messages: vec![crate::Message::user("fresh start")],
        });

    assert_eq!(output.modifiers.len(), 2);
}

#[test]
fn test_run_modifier_serde_shape() {
    let modifier = RunModifier::SetOutput {
        value: serde_json::json!({"n": 1}),
    };
    let json = serde_json::to_value(&modifier).unwrap();
    assert_eq!(json["type"], "set_output");

    let modifier = RunModifier::ReplaceMessages { messages: vec![] };
    let json = serde_json::to_value(&modifier).unwrap();
    assert_eq!(json["type"], "replace_messages");
}

#[test]
fn test_tool_result_content_to_text() {
    let text = ToolResultContent::Text("plain".to_string());
    assert_eq!(text.to_text(), "plain");

    let structured = ToolResultContent::Structured(serde_json::json!({"a": 1}));
    assert_eq!(structured.to_text(), r#"{"a":1}"#);
}

#[test]
fn test_validation_result() {
    assert!(ValidationResult::valid().is_valid());
    assert!(!ValidationResult::error("invalid").is_valid());

    let result = ValidationResult::invalid([
        ValidationError::new("field required"),
        ValidationError::with_path("must be positive", "count"),
    ]);

    if let ValidationResult::Invalid { errors } = result {
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].path.as_deref(), Some("count"));
    } else {
        panic!("Expected Invalid result");
    }
}

#[test]
fn test_validation_error_summary() {
    assert_eq!(ValidationResult::valid().error_summary(), None);

    let result = ValidationResult::invalid([
        ValidationError::new("missing field"),
        ValidationError::with_path("wrong type", "count"),
    ]);
    assert_eq!(
        result.error_summary().unwrap(),
        "missing field, count: wrong type"
    );
}

#[test]
fn test_truncate_to_no_op_when_within_limit() {
    let mut output = ToolOutput::text("short text");
    output.truncate_to(100);
    assert!(matches!(&output.content, ToolResultContent::Text(s) if s == "short text"));
}

#[test]
fn test_truncate_to_preserves_start_and_end() {
    let text = format!("START{}END", "x".repeat(1000));
    let mut output = ToolOutput::text(text);
    output.truncate_to(100);
    if let ToolResultContent::Text(ref s) = output.content {
        assert!(s.starts_with("START"));
        assert!(s.ends_with("END"));
        assert!(s.contains("output truncated"));
    } else {
        panic!("Expected Text content");
    }
}

#[test]
fn test_truncate_to_ignores_structured() {
    let mut output = ToolOutput::structured(serde_json::json!({"key": "value"}));
    output.truncate_to(1);
    assert!(matches!(&output.content, ToolResultContent::Structured(_)));
}

#[test]
fn test_truncate_to_utf8_safe() {
    let text = "你好世界".repeat(100);
    let mut output = ToolOutput::text(text);
    output.truncate_to(100);
    if let ToolResultContent::Text(ref s) = output.content {
        assert!(s.contains("output truncated"));
    } else {
        panic!("Expected Text content");
    }
}
