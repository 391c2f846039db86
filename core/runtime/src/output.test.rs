use std::sync::Arc;

use ensemble_protocol::Message;
use ensemble_protocol::OutputMode;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::error::RunError;

fn make_state(mode: OutputMode) -> AgentRunState {
    let definition = AgentDefinition::new("lead", "test-model").with_output_mode(mode);
    AgentRunState::new(Arc::new(definition))
}

#[test]
fn test_last_message_takes_most_recent_assistant_text() {
    let mut state = make_state(OutputMode::LastMessage);
    state.history.push(Message::user("question"));
    state.history.push(Message::assistant("first answer"));
    state.history.push(Message::user("follow-up"));
    state.history.push(Message::assistant("final answer"));

    let output = resolve_output(&state.definition, &state).unwrap();
    assert_eq!(output.as_text(), Some("final answer"));
}

#[test]
fn test_last_message_empty_when_no_assistant_message() {
    let mut state = make_state(OutputMode::LastMessage);
    state.history.push(Message::user("question"));

    let output = resolve_output(&state.definition, &state).unwrap();
    assert_eq!(output.as_text(), Some(""));
}

#[test]
fn test_all_messages_returns_history_as_it_stands() {
    let mut state = make_state(OutputMode::AllMessages);
    state.history.push(Message::user("question"));
    state.history.push(Message::assistant("answer"));

    let output = resolve_output(&state.definition, &state).unwrap();
    let messages = output.as_messages().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text(), "answer");
}

#[test]
fn test_structured_output_returns_stored_value() {
    let definition = AgentDefinition::new("lead", "test-model")
        .with_output_mode(OutputMode::StructuredOutput)
        .with_output_schema(json!({"type": "object"}));
    let mut state = AgentRunState::new(Arc::new(definition));
    state.structured_output = Some(json!({"verdict": "pass"}));

    let output = resolve_output(&state.definition, &state).unwrap();
    assert_eq!(output.as_structured(), Some(&json!({"verdict": "pass"})));
}

#[test]
fn test_structured_output_missing_is_an_error_not_empty() {
    let definition = AgentDefinition::new("lead", "test-model")
        .with_output_mode(OutputMode::StructuredOutput)
        .with_output_schema(json!({"type": "object"}));
    let state = AgentRunState::new(Arc::new(definition));

    let err = resolve_output(&state.definition, &state).unwrap_err();
    assert!(matches!(err, RunError::MissingStructuredOutput { .. }));
    assert!(err.to_string().contains("lead"));
}
