use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

fn tool_use_response() -> CompletionResponse {
    CompletionResponse::new("test-model")
        .with_content(vec![
            ContentPart::text("Let me check."),
            ContentPart::tool_use("call_1", "search", json!({"query": "rust"})),
            ContentPart::tool_use("call_2", "read_file", json!({"path": "a.txt"})),
        ])
        .with_finish_reason(FinishReason::ToolCalls)
}

#[test]
fn test_finish_reason_default_and_serde() {
    assert_eq!(FinishReason::default(), FinishReason::Stop);
    assert_eq!(
        serde_json::to_value(FinishReason::MaxTokens).unwrap(),
        json!("max_tokens")
    );
    assert_eq!(
        serde_json::from_value::<FinishReason>(json!("tool_calls")).unwrap(),
        FinishReason::ToolCalls
    );
}

#[test]
fn test_text_concatenates_text_parts() {
    let response = CompletionResponse::new("test-model").with_content(vec![
        ContentPart::text("Hello, "),
        ContentPart::tool_use("call_1", "search", json!({})),
        ContentPart::text("world"),
    ]);
    assert_eq!(response.text(), "Hello, world");
}

#[test]
fn test_tool_calls_preserve_content_order() {
    let response = tool_use_response();
    assert!(response.has_tool_calls());

    let calls = response.tool_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].name, "search");
    assert_eq!(calls[0].arguments, json!({"query": "rust"}));
    assert_eq!(calls[1].id, "call_2");
}

#[test]
fn test_no_tool_calls() {
    let response = CompletionResponse::new("test-model")
        .with_content(vec![ContentPart::text("All done.")]);
    assert!(!response.has_tool_calls());
    assert!(response.tool_calls().is_empty());
}

#[test]
fn test_assistant_message() {
    let response = tool_use_response();
    let message = response.assistant_message();
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.content.len(), 3);
    assert_eq!(message.text(), "Let me check.");
}

#[test]
fn test_usage_attached() {
    let response = CompletionResponse::new("test-model").with_usage(TokenUsage::new(120, 30));
    assert_eq!(response.usage.input_tokens, 120);
    assert_eq!(response.usage.output_tokens, 30);
    assert_eq!(response.usage.total(), 150);
}
