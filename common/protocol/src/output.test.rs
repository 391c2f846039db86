use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_output_mode_default_and_display() {
    assert_eq!(OutputMode::default(), OutputMode::LastMessage);
    assert_eq!(OutputMode::LastMessage.to_string(), "last_message");
    assert_eq!(OutputMode::StructuredOutput.to_string(), "structured_output");
}

#[test]
fn test_output_mode_serde() {
    let mode: OutputMode = serde_json::from_str(r#""all_messages""#).unwrap();
    assert_eq!(mode, OutputMode::AllMessages);
    assert_eq!(
        serde_json::to_string(&OutputMode::StructuredOutput).unwrap(),
        r#""structured_output""#
    );
}

#[test]
fn test_stop_reason_display() {
    assert_eq!(StopReason::ModelStop.to_string(), "model_stop");
    assert_eq!(
        StopReason::StepBudgetExhausted.to_string(),
        "step_budget_exhausted"
    );
    assert_eq!(StopReason::ProgramComplete.to_string(), "program_complete");
}

#[test]
fn test_agent_output_accessors() {
    let last = AgentOutput::LastMessage {
        text: "done".to_string(),
    };
    assert_eq!(last.as_text(), Some("done"));
    assert!(last.as_structured().is_none());

    let structured = AgentOutput::Structured {
        value: serde_json::json!({"count": 3}),
    };
    assert_eq!(
        structured.as_structured(),
        Some(&serde_json::json!({"count": 3}))
    );
}

#[test]
fn test_agent_output_to_text() {
    let all = AgentOutput::AllMessages {
        messages: vec![
            Message::user("question"),
            Message::assistant("answer"),
            Message::new(crate::Role::Assistant, vec![]),
        ],
    };
    assert_eq!(all.to_text(), "question\nanswer");

    let structured = AgentOutput::Structured {
        value: serde_json::json!({"ok": true}),
    };
    assert_eq!(structured.to_text(), r#"{"ok":true}"#);
}

#[test]
fn test_agent_output_serde_shape() {
    let output = AgentOutput::LastMessage {
        text: "hi".to_string(),
    };
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["type"], "last_message");
    assert_eq!(json["text"], "hi");
}
