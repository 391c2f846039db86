use ensemble_protocol::ToolDefinition;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

#[test]
fn test_request_builder() {
    let request = CompletionRequest::new("test-model")
        .with_system_prompt("You are a helpful assistant.")
        .with_messages(vec![Message::user("Hello!")])
        .with_temperature(0.7)
        .with_max_tokens(1000);

    assert_eq!(request.model, "test-model");
    assert_eq!(
        request.system_prompt.as_deref(),
        Some("You are a helpful assistant.")
    );
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.temperature, Some(0.7));
    assert_eq!(request.max_tokens, Some(1000));
}

#[test]
fn test_add_message() {
    let request = CompletionRequest::new("test-model")
        .add_message(Message::user("first"))
        .add_message(Message::assistant("second"));

    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].text(), "first");
    assert_eq!(request.messages[1].text(), "second");
}

#[test]
fn test_has_tools() {
    let request = CompletionRequest::new("test-model");
    assert!(!request.has_tools());

    let schema = json!({"type": "object", "properties": {}});
    let request = request.with_tools(vec![ToolDefinition::new("search", schema)]);
    assert!(request.has_tools());
}

#[test]
fn test_request_serde_skips_empty_fields() {
    let request = CompletionRequest::new("test-model").with_messages(vec![Message::user("hi")]);

    let value = serde_json::to_value(&request).unwrap();
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("system_prompt"));
    assert!(!object.contains_key("tools"));
    assert!(!object.contains_key("temperature"));
    assert_eq!(object["model"], "test-model");
}
