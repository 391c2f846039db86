use super::*;
use ensemble_protocol::ToolResultContent;
use pretty_assertions::assert_eq;
use serde_json::json;

fn assistant_with_tool_use(text: &str, call_id: &str) -> Message {
    Message::new(
        Role::Assistant,
        vec![
            ContentPart::text(text),
            ContentPart::tool_use(call_id, "lookup", json!({"key": "a"})),
        ],
    )
}

#[test]
fn test_push_preserves_order() {
    let mut history = MessageHistory::new();
    history.push(Message::user("one"));
    history.push(Message::assistant("two"));
    history.push(Message::user("three"));

    assert_eq!(history.len(), 3);
    let texts: Vec<String> = history.messages().iter().map(Message::text).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[test]
fn test_replace_all_is_wholesale() {
    let mut history = MessageHistory::new();
    history.push(Message::user("old 1"));
    history.push(Message::assistant("old 2"));

    let replacement = vec![Message::user("only survivor")];
    history.replace_all(replacement.clone());

    assert_eq!(history.messages(), replacement.as_slice());
    assert_eq!(history.len(), 1);
}

#[test]
fn test_last_assistant_skips_later_tool_messages() {
    let mut history = MessageHistory::new();
    history.push(Message::user("question"));
    history.push(assistant_with_tool_use("checking", "c1"));
    history.push(Message::tool_result(
        "c1",
        ToolResultContent::Text("found".to_string()),
    ));

    assert_eq!(history.last_assistant_text().unwrap(), "checking");
    assert!(history.last().unwrap().role == Role::Tool);
}

#[test]
fn test_last_assistant_none_when_absent() {
    let mut history = MessageHistory::new();
    history.push(Message::user("hello"));
    assert!(history.last_assistant().is_none());
    assert!(history.last_assistant_text().is_none());
}

#[test]
fn test_for_completion_keeps_valid_pairs() {
    let mut history = MessageHistory::new();
    history.push(Message::user("q"));
    history.push(assistant_with_tool_use("checking", "c1"));
    history.push(Message::tool_result(
        "c1",
        ToolResultContent::Text("found".to_string()),
    ));

    let completion = history.for_completion();
    assert_eq!(completion.len(), 3);
    assert_eq!(completion, history.messages().to_vec());
}

#[test]
fn test_for_completion_drops_orphan_tool_results() {
    let mut history = MessageHistory::new();
    // A replacement left a result with no matching tool use.
    history.replace_all(vec![
        Message::user("q"),
        Message::tool_result("ghost", ToolResultContent::Text("orphan".to_string())),
        Message::assistant("fine"),
    ]);

    let completion = history.for_completion();
    assert_eq!(completion.len(), 2);
    assert_eq!(completion[0].text(), "q");
    assert_eq!(completion[1].text(), "fine");
    // The log itself is untouched.
    assert_eq!(history.len(), 3);
}

#[test]
fn test_for_completion_results_must_answer_nearest_assistant() {
    let mut history = MessageHistory::new();
    history.push(assistant_with_tool_use("first", "c1"));
    history.push(Message::assistant("second, no tools"));
    // Result for c1 arrives after an unrelated assistant message.
    history.push(Message::tool_result(
        "c1",
        ToolResultContent::Text("late".to_string()),
    ));

    let completion = history.for_completion();
    assert_eq!(completion.len(), 2);
    assert!(completion.iter().all(|m| m.tool_result_ids().is_empty()));
}

#[test]
fn test_for_completion_drops_empty_messages() {
    let mut history = MessageHistory::new();
    history.push(Message::user("q"));
    history.push(Message::new(Role::Assistant, vec![]));

    let completion = history.for_completion();
    assert_eq!(completion.len(), 1);
}

#[test]
fn test_unresolved_tool_call_ids() {
    let mut history = MessageHistory::new();
    history.push(Message::user("q"));
    history.push(Message::new(
        Role::Assistant,
        vec![
            ContentPart::tool_use("c1", "lookup", json!({})),
            ContentPart::tool_use("c2", "lookup", json!({})),
        ],
    ));
    assert_eq!(history.unresolved_tool_call_ids(), vec!["c1", "c2"]);

    history.push(Message::tool_result(
        "c1",
        ToolResultContent::Text("found".to_string()),
    ));
    assert_eq!(history.unresolved_tool_call_ids(), vec!["c2"]);

    history.push(Message::tool_result(
        "c2",
        ToolResultContent::Text("found".to_string()),
    ));
    assert!(history.unresolved_tool_call_ids().is_empty());
}

#[test]
fn test_unresolved_empty_without_assistant() {
    let mut history = MessageHistory::new();
    assert!(history.unresolved_tool_call_ids().is_empty());
    history.push(Message::user("q"));
    assert!(history.unresolved_tool_call_ids().is_empty());
}

#[test]
fn test_with_messages_and_into_messages() {
    let seed = vec![Message::user("a"), Message::assistant("b")];
    let history = MessageHistory::with_messages(seed.clone());
    assert_eq!(history.into_messages(), seed);
}
