use ensemble_protocol::Role;
use ensemble_protocol::RunId;

use super::*;

fn make_context() -> ToolContext {
    ToolContext::new("call-1", RunId::from("run-1"), "researcher")
}

#[test]
fn test_tool_properties() {
    let tool = SetMessagesTool::new();
    assert_eq!(tool.name(), "set_messages");
    assert!(!tool.is_concurrent_safe());
}

#[tokio::test]
async fn test_replaces_history_with_given_messages() {
    let mut ctx = make_context();
    let input = serde_json::json!({
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": "the distilled task"}]},
            {"role": "assistant", "content": [{"type": "text", "text": "understood"}]}
        ]
    });

    let output = SetMessagesTool::new().execute(input, &mut ctx).await.unwrap();

    assert!(!output.is_error);
    assert!(output.content.to_text().contains("2 messages"));
    assert_eq!(output.modifiers.len(), 1);
    match &output.modifiers[0] {
        RunModifier::ReplaceMessages { messages } => {
            assert_eq!(messages.len(), 2);
            assert_eq!(messages[0].role, Role::User);
            assert_eq!(messages[0].text(), "the distilled task");
            assert_eq!(messages[1].role, Role::Assistant);
        }
        other => panic!("unexpected modifier: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_list_clears_history() {
    let mut ctx = make_context();
    let input = serde_json::json!({"messages": []});

    let output = SetMessagesTool::new().execute(input, &mut ctx).await.unwrap();

    match &output.modifiers[0] {
        RunModifier::ReplaceMessages { messages } => assert!(messages.is_empty()),
        other => panic!("unexpected modifier: {other:?}"),
    }
}

#[tokio::test]
async fn test_messages_must_be_an_array() {
    let mut ctx = make_context();
    let err = SetMessagesTool::new()
        .execute(serde_json::json!({"messages": "nope"}), &mut ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("messages must be an array"));
}

#[tokio::test]
async fn test_malformed_message_is_invalid_input() {
    let mut ctx = make_context();
    let input = serde_json::json!({
        "messages": [{"role": "narrator", "content": []}]
    });
    let err = SetMessagesTool::new().execute(input, &mut ctx).await.unwrap_err();
    assert!(err.to_string().contains("JSON error"));
}
