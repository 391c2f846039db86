use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

#[test]
fn test_context_defaults() {
    let ctx = ToolContext::new("call_1", RunId::from("run-1"), "researcher");
    assert_eq!(ctx.call_id, "call_1");
    assert_eq!(ctx.run_id.as_str(), "run-1");
    assert_eq!(ctx.agent_id, "researcher");
    assert!(ctx.output_schema.is_none());
    assert!(ctx.spawnable_agents.is_empty());
    assert!(!ctx.can_spawn("worker"));
    assert!(!ctx.is_cancelled());
}

#[test]
fn test_context_builders() {
    let token = CancellationToken::new();
    let ctx = ToolContext::new("call_1", RunId::from("run-1"), "researcher")
        .with_output_schema(json!({"type": "object"}))
        .with_spawnable_agents(vec!["worker".to_string()])
        .with_cancel_token(token.clone());

    assert_eq!(ctx.output_schema, Some(json!({"type": "object"})));
    assert!(ctx.can_spawn("worker"));
    assert!(!ctx.can_spawn("critic"));

    token.cancel();
    assert!(ctx.is_cancelled());
}

#[tokio::test]
async fn test_emit_event_without_channel_is_noop() {
    let ctx = ToolContext::new("call_1", RunId::from("run-1"), "researcher");
    // Must not panic or block
    ctx.emit_event(RunEvent::OutputSet {
        run_id: "run-1".to_string(),
    })
    .await;
}

#[tokio::test]
async fn test_emit_event_delivers() {
    let (tx, mut rx) = mpsc::channel(4);
    let ctx =
        ToolContext::new("call_1", RunId::from("run-1"), "researcher").with_event_tx(tx);

    ctx.emit_event(RunEvent::OutputSet {
        run_id: "run-1".to_string(),
    })
    .await;

    let event = rx.recv().await.unwrap();
    assert!(matches!(event, RunEvent::OutputSet { .. }));
}

#[test]
fn test_spawn_request_serde() {
    let request: SpawnRequest = serde_json::from_value(json!({
        "agent_id": "worker",
        "prompt": "summarize the findings"
    }))
    .unwrap();
    assert_eq!(request.agent_id, "worker");
    assert_eq!(request.prompt.as_deref(), Some("summarize the findings"));
    assert!(request.params.is_none());
}

#[test]
fn test_spawn_outcome_serde_shape() {
    let completed = SpawnOutcome::Completed {
        agent_id: "worker".to_string(),
        output: AgentOutput::LastMessage {
            text: "done".to_string(),
        },
    };
    let value = serde_json::to_value(&completed).unwrap();
    assert_eq!(value["status"], "completed");
    assert_eq!(value["agent_id"], "worker");

    let failed = SpawnOutcome::Failed {
        agent_id: "worker".to_string(),
        error: "schema validation failed".to_string(),
    };
    let value = serde_json::to_value(&failed).unwrap();
    assert_eq!(value["status"], "failed");
    assert_eq!(value["error"], "schema validation failed");

    assert!(!completed.is_failed());
    assert!(failed.is_failed());
    assert_eq!(failed.agent_id(), "worker");
}
