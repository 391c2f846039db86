use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_event_serde_shape() {
    let event = RunEvent::RunStarted {
        run_id: "r1".to_string(),
        agent_id: "researcher".to_string(),
        parent_run_id: None,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "run_started");
    assert_eq!(json["agent_id"], "researcher");
    assert!(json.get("parent_run_id").is_none());

    let event = RunEvent::RunCompleted {
        run_id: "r1".to_string(),
        agent_id: "researcher".to_string(),
        stop_reason: StopReason::ModelStop,
        steps: 3,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["stop_reason"], "model_stop");
    assert_eq!(json["steps"], 3);
}

#[test]
fn test_event_run_id_accessor() {
    let event = RunEvent::ToolCallStarted {
        run_id: "r9".to_string(),
        call_id: "c1".to_string(),
        name: "lookup".to_string(),
    };
    assert_eq!(event.run_id(), "r9");

    let event = RunEvent::SpawnBatchCompleted {
        run_id: "r9".to_string(),
        succeeded: 2,
        failed: 1,
    };
    assert_eq!(event.run_id(), "r9");
}

#[test]
fn test_token_usage_total_and_add() {
    let mut usage = TokenUsage::new(100, 20);
    assert_eq!(usage.total(), 120);

    usage.add(&TokenUsage::new(50, 5));
    assert_eq!(usage.input_tokens, 150);
    assert_eq!(usage.output_tokens, 25);
    assert_eq!(usage.cache_read_tokens, None);

    let cached = TokenUsage {
        input_tokens: 10,
        output_tokens: 1,
        cache_read_tokens: Some(64),
    };
    usage.add(&cached);
    assert_eq!(usage.cache_read_tokens, Some(64));
}
