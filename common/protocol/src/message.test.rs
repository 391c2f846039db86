use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_role_serde() {
    assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
    assert_eq!(
        serde_json::to_string(&Role::Assistant).unwrap(),
        r#""assistant""#
    );
    let role: Role = serde_json::from_str(r#""tool""#).unwrap();
    assert_eq!(role, Role::Tool);
}

#[test]
fn test_message_constructors() {
    let user = Message::user("hello");
    assert_eq!(user.role, Role::User);
    assert_eq!(user.text(), "hello");

    let assistant = Message::assistant("hi there");
    assert_eq!(assistant.role, Role::Assistant);
    assert!(!assistant.has_tool_use());

    let system = Message::system("be brief");
    assert_eq!(system.role, Role::System);
}

#[test]
fn test_tool_result_messages() {
    let ok = Message::tool_result("call-1", ToolResultContent::Text("done".to_string()));
    assert_eq!(ok.role, Role::Tool);
    assert_eq!(ok.tool_result_ids(), vec!["call-1"]);

    let err = Message::tool_error("call-2", "boom");
    match &err.content[0] {
        ContentPart::ToolResult {
            tool_use_id,
            is_error,
            ..
        } => {
            assert_eq!(tool_use_id, "call-2");
            assert!(is_error);
        }
        other => panic!("Expected ToolResult, got {other:?}"),
    }
}

#[test]
fn test_mixed_content_text_concatenation() {
    let msg = Message::new(
        Role::Assistant,
        vec![
            ContentPart::text("Let me check. "),
            ContentPart::tool_use("call-1", "lookup", serde_json::json!({"key": "a"})),
            ContentPart::text("One moment."),
        ],
    );
    assert_eq!(msg.text(), "Let me check. One moment.");
    assert!(msg.has_tool_use());
    assert_eq!(msg.tool_uses().len(), 1);
    assert_eq!(msg.tool_use_ids(), vec!["call-1"]);
}

#[test]
fn test_content_part_serde_shape() {
    let part = ContentPart::tool_use("id-1", "search", serde_json::json!({"q": "rust"}));
    let json = serde_json::to_value(&part).unwrap();
    assert_eq!(json["type"], "tool_use");
    assert_eq!(json["id"], "id-1");
    assert_eq!(json["name"], "search");

    let text = ContentPart::text("hi");
    let json = serde_json::to_value(&text).unwrap();
    assert_eq!(json["type"], "text");
    assert_eq!(json["text"], "hi");
}

#[test]
fn test_tool_result_is_error_defaults_to_false() {
    let json = r#"{"type":"tool_result","tool_use_id":"c1","content":"ok"}"#;
    let part: ContentPart = serde_json::from_str(json).unwrap();
    match part {
        ContentPart::ToolResult { is_error, .. } => assert!(!is_error),
        other => panic!("Expected ToolResult, got {other:?}"),
    }
}
