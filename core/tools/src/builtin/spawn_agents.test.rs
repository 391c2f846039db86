use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use ensemble_protocol::AgentOutput;
use ensemble_protocol::RunId;
use ensemble_protocol::ToolResultContent;

use super::*;
use crate::context::AgentSpawner;
use crate::context::SpawnOutcome;

fn make_context() -> ToolContext {
    ToolContext::new("call-1", RunId::from("run-1"), "lead")
}

/// Spawner that records requests and answers each with a canned outcome.
struct MockSpawner {
    seen: Mutex<Vec<SpawnRequest>>,
    failing: Vec<&'static str>,
}

impl MockSpawner {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            failing: Vec::new(),
        }
    }

    fn failing(agent_ids: Vec<&'static str>) -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            failing: agent_ids,
        }
    }
}

#[async_trait]
impl AgentSpawner for MockSpawner {
    async fn spawn_many(&self, requests: Vec<SpawnRequest>) -> Vec<SpawnOutcome> {
        self.seen.lock().unwrap().extend(requests.iter().cloned());
        requests
            .into_iter()
            .map(|r| {
                if self.failing.contains(&r.agent_id.as_str()) {
                    SpawnOutcome::Failed {
                        agent_id: r.agent_id,
                        error: "model unavailable".to_string(),
                    }
                } else {
                    SpawnOutcome::Completed {
                        agent_id: r.agent_id.clone(),
                        output: AgentOutput::LastMessage {
                            text: format!("{} done", r.agent_id),
                        },
                    }
                }
            })
            .collect()
    }
}

fn structured(output: ToolOutput) -> Value {
    match output.content {
        ToolResultContent::Structured(value) => value,
        ToolResultContent::Text(text) => panic!("expected structured content, got: {text}"),
    }
}

#[test]
fn test_tool_properties() {
    let tool = SpawnAgentsTool::new();
    assert_eq!(tool.name(), "spawn_agents");
    assert!(tool.is_concurrent_safe());
}

#[tokio::test]
async fn test_rejects_batch_listing_every_undeclared_agent() {
    let spawner = Arc::new(MockSpawner::new());
    let mut ctx = make_context()
        .with_spawnable_agents(vec!["worker".to_string()])
        .with_spawner(spawner.clone());

    let input = serde_json::json!({
        "agents": [
            {"agent_id": "worker"},
            {"agent_id": "critic"},
            {"agent_id": "scout"}
        ]
    });
    let err = SpawnAgentsTool::new()
        .execute(input, &mut ctx)
        .await
        .unwrap_err();

    assert!(
        err.to_string()
            .contains("Agents not declared as spawnable: critic, scout"),
        "unexpected error: {err}"
    );
    assert!(err.is_capability_violation());
    // No child may have started
    assert!(spawner.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_spawns_all_and_preserves_request_order() {
    let spawner = Arc::new(MockSpawner::new());
    let mut ctx = make_context()
        .with_spawnable_agents(vec!["worker".to_string(), "critic".to_string()])
        .with_spawner(spawner.clone());

    let input = serde_json::json!({
        "agents": [
            {"agent_id": "worker", "prompt": "dig"},
            {"agent_id": "critic"}
        ]
    });
    let output = SpawnAgentsTool::new().execute(input, &mut ctx).await.unwrap();

    assert!(!output.is_error);
    let value = structured(output);
    let outcomes = value.as_array().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["agent_id"], "worker");
    assert_eq!(outcomes[0]["status"], "completed");
    assert_eq!(outcomes[1]["agent_id"], "critic");

    let seen = spawner.seen.lock().unwrap();
    assert_eq!(seen[0].prompt.as_deref(), Some("dig"));
    assert_eq!(seen[1].agent_id, "critic");
}

#[tokio::test]
async fn test_child_failure_reported_alongside_successes() {
    let spawner = Arc::new(MockSpawner::failing(vec!["critic"]));
    let mut ctx = make_context()
        .with_spawnable_agents(vec![
            "worker".to_string(),
            "critic".to_string(),
            "scout".to_string(),
        ])
        .with_spawner(spawner);

    let input = serde_json::json!({
        "agents": [
            {"agent_id": "worker"},
            {"agent_id": "critic"},
            {"agent_id": "scout"}
        ]
    });
    let output = SpawnAgentsTool::new().execute(input, &mut ctx).await.unwrap();

    let value = structured(output);
    let outcomes = value.as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0]["status"], "completed");
    assert_eq!(outcomes[1]["status"], "failed");
    assert_eq!(outcomes[1]["error"], "model unavailable");
    assert_eq!(outcomes[2]["status"], "completed");
}

#[tokio::test]
async fn test_without_spawner_returns_stub_response() {
    let mut ctx = make_context().with_spawnable_agents(vec!["worker".to_string()]);

    let input = serde_json::json!({"agents": [{"agent_id": "worker"}]});
    let output = SpawnAgentsTool::new().execute(input, &mut ctx).await.unwrap();

    assert!(!output.is_error);
    assert!(output.content.to_text().contains("no spawner connected"));
}

#[tokio::test]
async fn test_missing_agents_field_is_invalid_input() {
    let mut ctx = make_context();
    let err = SpawnAgentsTool::new()
        .execute(serde_json::json!({}), &mut ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("agents must be an array"));
}

#[tokio::test]
async fn test_empty_agents_list_spawns_nothing() {
    let spawner = Arc::new(MockSpawner::new());
    let mut ctx = make_context().with_spawner(spawner.clone());

    let input = serde_json::json!({"agents": []});
    let output = SpawnAgentsTool::new().execute(input, &mut ctx).await.unwrap();

    let value = structured(output);
    assert_eq!(value.as_array().unwrap().len(), 0);
    assert!(spawner.seen.lock().unwrap().is_empty());
}
