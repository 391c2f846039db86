use ensemble_protocol::RunId;

use super::*;

fn make_context() -> ToolContext {
    ToolContext::new("call-1", RunId::from("run-1"), "researcher")
}

#[test]
fn test_tool_properties() {
    let tool = SetOutputTool::new();
    assert_eq!(tool.name(), "set_output");
    assert!(!tool.is_concurrent_safe());
}

#[tokio::test]
async fn test_records_output_as_run_modifier() {
    let mut ctx = make_context();
    let input = serde_json::json!({"output": {"answer": 42}});

    let output = SetOutputTool::new().execute(input, &mut ctx).await.unwrap();

    assert!(!output.is_error);
    assert_eq!(output.modifiers.len(), 1);
    match &output.modifiers[0] {
        RunModifier::SetOutput { value } => {
            assert_eq!(value, &serde_json::json!({"answer": 42}));
        }
        other => panic!("unexpected modifier: {other:?}"),
    }
}

#[tokio::test]
async fn test_value_matching_schema_is_accepted() {
    let schema = serde_json::json!({
        "type": "object",
        "properties": {"answer": {"type": "integer"}},
        "required": ["answer"]
    });
    let mut ctx = make_context().with_output_schema(schema);

    let input = serde_json::json!({"output": {"answer": 42}});
    let output = SetOutputTool::new().execute(input, &mut ctx).await.unwrap();

    assert!(!output.is_error);
    assert_eq!(output.modifiers.len(), 1);
}

#[tokio::test]
async fn test_schema_mismatch_is_an_error_result_not_a_failure() {
    let schema = serde_json::json!({
        "type": "object",
        "properties": {"answer": {"type": "integer"}},
        "required": ["answer"]
    });
    let mut ctx = make_context().with_output_schema(schema);

    let input = serde_json::json!({"output": {"answer": "forty-two"}});
    let output = SetOutputTool::new().execute(input, &mut ctx).await.unwrap();

    // In-band error: the model can correct the value and call again
    assert!(output.is_error);
    assert!(output.modifiers.is_empty());
    assert!(
        output
            .content
            .to_text()
            .contains("does not match the declared schema")
    );
}

#[tokio::test]
async fn test_missing_output_field_is_invalid_input() {
    let mut ctx = make_context();
    let err = SetOutputTool::new()
        .execute(serde_json::json!({}), &mut ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("output is required"));
}

#[tokio::test]
async fn test_no_schema_accepts_any_value() {
    let mut ctx = make_context();
    let input = serde_json::json!({"output": [1, "mixed", null]});

    let output = SetOutputTool::new().execute(input, &mut ctx).await.unwrap();

    assert!(!output.is_error);
    assert_eq!(output.modifiers.len(), 1);
}
