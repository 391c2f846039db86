use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use ensemble_protocol::OutputMode;
use ensemble_protocol::TokenUsage;
use ensemble_protocol::ToolOutput;
use ensemble_protocol::ToolResultContent;
use ensemble_provider::FinishReason;
use ensemble_provider::RetryConfig;
use ensemble_provider::error::Result as ProviderResult;
use ensemble_tools::Tool;
use ensemble_tools::ToolContext;
use ensemble_tools::ToolError;
use ensemble_tools::register_builtin_tools;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;

use super::*;
use crate::error::RunError;

// ---------- model mocks ----------

/// Serves canned responses in order and records every request.
struct ScriptedModel {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    fn new(responses: impl IntoIterator<Item = CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Model for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("model script exhausted");
        Ok(response)
    }
}

/// Requests the echo tool on every call; never stops on its own.
struct ToolLoopModel {
    calls: AtomicU32,
}

#[async_trait]
impl Model for ToolLoopModel {
    fn name(&self) -> &str {
        "tool-loop"
    }

    async fn complete(&self, _request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CompletionResponse::new("tool-loop")
            .with_content(vec![
                ContentPart::text(format!("working on step {n}")),
                ContentPart::tool_use(format!("c{n}"), "echo", json!({})),
            ])
            .with_finish_reason(FinishReason::ToolCalls)
            .with_usage(TokenUsage::new(10, 5)))
    }
}

/// Routes on the request's model id. The parent agent ("parent") follows
/// a canned script; "fail" children error out, "delay:<ms>" children
/// sleep before answering, "hang" children never answer, and anything
/// else answers immediately.
struct FamilyModel {
    parent_responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
    child_calls: AtomicU32,
}

impl FamilyModel {
    fn new(parent_responses: impl IntoIterator<Item = CompletionResponse>) -> Self {
        Self {
            parent_responses: Mutex::new(parent_responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            child_calls: AtomicU32::new(0),
        }
    }

    fn requests_for(&self, model: &str) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.model == model)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Model for FamilyModel {
    fn name(&self) -> &str {
        "family"
    }

    async fn complete(&self, request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        if model == "parent" {
            return Ok(self
                .parent_responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("parent script exhausted"));
        }

        self.child_calls.fetch_add(1, Ordering::SeqCst);
        if model == "fail" {
            return Err(ProviderError::InvalidRequest("scripted failure".to_string()));
        }
        if model == "hang" {
            return std::future::pending::<ProviderResult<CompletionResponse>>().await;
        }
        if let Some(ms) = model.strip_prefix("delay:") {
            let ms: u64 = ms.parse().unwrap();
            tokio::time::sleep(Duration::from_millis(ms)).await;
            return Ok(text_response(format!("answered after {ms}ms")));
        }
        Ok(text_response("child done"))
    }
}

/// Fails with a retryable error for the first `failures` calls.
struct FlakyModel {
    failures: u32,
    calls: AtomicU32,
}

#[async_trait]
impl Model for FlakyModel {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn complete(&self, _request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(ProviderError::Transport("connection reset".to_string()));
        }
        Ok(text_response("recovered"))
    }
}

/// Never responds; used to park a run so cancellation can interrupt it.
struct PendingModel;

#[async_trait]
impl Model for PendingModel {
    fn name(&self) -> &str {
        "pending"
    }

    async fn complete(&self, _request: CompletionRequest) -> ProviderResult<CompletionResponse> {
        std::future::pending().await
    }
}

// ---------- tool mocks ----------

/// Counts executions so tests can prove a handler ran, or never did.
struct CountingTool {
    tool_name: &'static str,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.tool_name
    }

    fn description(&self) -> &str {
        "Counts its own executions"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(
        &self,
        _input: Value,
        _ctx: &mut ToolContext,
    ) -> ensemble_tools::Result<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutput::text("echoed"))
    }
}

/// Always fails in-band with an execution error.
struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "brittle"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn execute(
        &self,
        _input: Value,
        _ctx: &mut ToolContext,
    ) -> ensemble_tools::Result<ToolOutput> {
        Err(ToolError::ExecutionFailed {
            message: "boom".to_string(),
            location: snafu::Location::default(),
        })
    }
}

// ---------- harness ----------

fn text_response(text: impl Into<String>) -> CompletionResponse {
    CompletionResponse::new("scripted")
        .with_content(vec![ContentPart::text(text.into())])
        .with_usage(TokenUsage::new(10, 5))
}

fn tool_response(id: &str, name: &str, arguments: Value) -> CompletionResponse {
    CompletionResponse::new("scripted")
        .with_content(vec![ContentPart::tool_use(id, name, arguments)])
        .with_finish_reason(FinishReason::ToolCalls)
        .with_usage(TokenUsage::new(10, 5))
}

fn registry_of(definitions: Vec<AgentDefinition>) -> Arc<AgentRegistry> {
    let mut builder = AgentRegistry::builder();
    for definition in definitions {
        builder = builder.register(definition);
    }
    Arc::new(builder.build().unwrap())
}

fn base_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry);
    registry
}

fn tools_with_echo(calls: Arc<AtomicU32>) -> Arc<ToolRegistry> {
    let mut registry = base_tools();
    registry.register(CountingTool {
        tool_name: "echo",
        calls,
    });
    Arc::new(registry)
}

fn parent_def(spawnable: &[&str]) -> AgentDefinition {
    AgentDefinition::new("lead", "parent")
        .with_tools(["spawn_agents"])
        .with_spawnable_agents(spawnable.iter().copied())
}

fn spawn_args(agent_ids: &[&str]) -> Value {
    json!({
        "agents": agent_ids
            .iter()
            .map(|id| json!({"agent_id": id, "prompt": format!("task for {id}")}))
            .collect::<Vec<_>>()
    })
}

fn drain(rx: &mut mpsc::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn event_label(event: &RunEvent) -> &'static str {
    match event {
        RunEvent::RunStarted { .. } => "run_started",
        RunEvent::RunCompleted { .. } => "run_completed",
        RunEvent::RunFailed { .. } => "run_failed",
        RunEvent::StepStarted { .. } => "step_started",
        RunEvent::ModelCallCompleted { .. } => "model_call_completed",
        RunEvent::ModelCallRetrying { .. } => "model_call_retrying",
        RunEvent::AssistantMessage { .. } => "assistant_message",
        RunEvent::ToolCallStarted { .. } => "tool_call_started",
        RunEvent::ToolCallCompleted { .. } => "tool_call_completed",
        RunEvent::MessagesReplaced { .. } => "messages_replaced",
        RunEvent::OutputSet { .. } => "output_set",
        RunEvent::SpawnBatchStarted { .. } => "spawn_batch_started",
        RunEvent::SpawnBatchCompleted { .. } => "spawn_batch_completed",
    }
}

/// Pull the structured spawn results out of a run's tool messages.
fn spawn_results(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .flat_map(|m| m.content.iter())
        .find_map(|part| match part {
            ContentPart::ToolResult {
                content: ToolResultContent::Structured(value),
                ..
            } => value.as_array().cloned(),
            _ => None,
        })
        .unwrap_or_default()
}

// ---------- default loop ----------

#[tokio::test]
async fn test_single_turn_resolves_last_message() {
    let model = Arc::new(ScriptedModel::new([text_response("The answer is 42.")]));
    let registry = registry_of(vec![AgentDefinition::new("solo", "m")]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone());

    let outcome = runner
        .run("solo", RunInput::prompt("What is the answer?"))
        .await
        .unwrap();

    assert_eq!(outcome.agent_id, "solo");
    assert_eq!(outcome.stop_reason, StopReason::ModelStop);
    assert_eq!(outcome.steps, 1);
    assert_eq!(outcome.output.as_text(), Some("The answer is 42."));
    assert_eq!(outcome.usage, TokenUsage::new(10, 5));
    assert_eq!(model.calls(), 1);

    let roles: Vec<Role> = outcome.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_request_carries_prompt_sections_and_system_prompt() {
    let model = Arc::new(ScriptedModel::new([text_response("ok")]));
    let definition = AgentDefinition::new("researcher", "m")
        .with_system_prompt("You research things.")
        .with_instructions_prompt("Cite sources.")
        .with_input_schema(json!({
            "type": "object",
            "required": ["topic"],
            "properties": {"topic": {"type": "string"}}
        }));
    let registry = registry_of(vec![definition]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone());

    runner
        .run(
            "researcher",
            RunInput::prompt("Dig into this").with_params(json!({"topic": "rust"})),
        )
        .await
        .unwrap();

    let request = model.request(0);
    assert_eq!(request.system_prompt.as_deref(), Some("You research things."));
    assert_eq!(request.messages.len(), 1);

    let opening = request.messages[0].text();
    let prompt_at = opening.find("Dig into this").unwrap();
    let instructions_at = opening.find("Cite sources.").unwrap();
    let params_at = opening.find("Input parameters:").unwrap();
    assert!(prompt_at < instructions_at);
    assert!(instructions_at < params_at);
    assert!(opening.contains("```json"));
    assert!(opening.contains("\"topic\""));
}

#[tokio::test]
async fn test_tool_loop_runs_until_model_stops() {
    let model = Arc::new(ScriptedModel::new([
        tool_response("c1", "echo", json!({})),
        text_response("finished"),
    ]));
    let echo_calls = Arc::new(AtomicU32::new(0));
    let registry = registry_of(vec![AgentDefinition::new("worker", "m").with_tools(["echo"])]);
    let runner = AgentRunner::new(registry, tools_with_echo(echo_calls.clone()), model.clone());

    let outcome = runner.run("worker", RunInput::prompt("go")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ModelStop);
    assert_eq!(outcome.steps, 2);
    assert_eq!(outcome.usage, TokenUsage::new(20, 10));
    assert_eq!(echo_calls.load(Ordering::SeqCst), 1);

    let roles: Vec<Role> = outcome.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert_eq!(outcome.messages[2].tool_result_ids(), vec!["c1"]);
}

#[tokio::test]
async fn test_tool_failure_flows_back_in_band() {
    let model = Arc::new(ScriptedModel::new([
        tool_response("c1", "brittle", json!({})),
        text_response("recovered anyway"),
    ]));
    let mut tools = base_tools();
    tools.register(FailingTool);
    let registry = registry_of(vec![AgentDefinition::new("worker", "m").with_tools(["brittle"])]);
    let runner = AgentRunner::new(registry, Arc::new(tools), model.clone());

    let outcome = runner.run("worker", RunInput::prompt("go")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ModelStop);
    assert_eq!(outcome.steps, 2);

    let tool_message = &outcome.messages[2];
    assert_eq!(tool_message.role, Role::Tool);
    match &tool_message.content[0] {
        ContentPart::ToolResult {
            content, is_error, ..
        } => {
            assert!(*is_error);
            assert_eq!(content.to_text(), "Execution failed: boom");
        }
        part => panic!("expected tool result, got {part:?}"),
    }
}

// ---------- capability checks ----------

#[tokio::test]
async fn test_unknown_agent_is_error() {
    let model = Arc::new(ScriptedModel::new([]));
    let registry = registry_of(vec![AgentDefinition::new("solo", "m")]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone());

    let error = runner
        .run("ghost", RunInput::prompt("anyone there?"))
        .await
        .unwrap_err();

    assert!(matches!(&error, RunError::UnknownAgent { agent_id, .. } if agent_id == "ghost"));
    assert!(error.is_capability_violation());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_invalid_params_rejected_before_any_model_call() {
    let model = Arc::new(ScriptedModel::new([text_response("never sent")]));
    let definition = AgentDefinition::new("strict", "m").with_input_schema(json!({
        "type": "object",
        "required": ["name"],
        "properties": {"name": {"type": "string"}}
    }));
    let registry = registry_of(vec![definition]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone());

    let error = runner
        .run("strict", RunInput::prompt("hi").with_params(json!({})))
        .await
        .unwrap_err();

    assert!(matches!(&error, RunError::SchemaValidation { agent_id, .. } if agent_id == "strict"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_undeclared_tool_fails_run_without_executing() {
    let model = Arc::new(ScriptedModel::new([tool_response("c1", "spy", json!({}))]));
    let spy_calls = Arc::new(AtomicU32::new(0));
    let mut tools = base_tools();
    tools.register(CountingTool {
        tool_name: "spy",
        calls: spy_calls.clone(),
    });
    // "spy" is registered but the agent only declares "echo".
    let registry = registry_of(vec![AgentDefinition::new("worker", "m").with_tools(["echo"])]);
    let runner = AgentRunner::new(registry, Arc::new(tools), model.clone());

    let error = runner.run("worker", RunInput::prompt("go")).await.unwrap_err();

    assert!(matches!(&error, RunError::ToolNotDeclared { name, .. } if name == "spy"));
    assert!(error.is_capability_violation());
    assert_eq!(spy_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_declared_but_unregistered_tool_fails_run() {
    let model = Arc::new(ScriptedModel::new([tool_response("c1", "missing", json!({}))]));
    let registry = registry_of(vec![AgentDefinition::new("worker", "m").with_tools(["missing"])]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model);

    let error = runner.run("worker", RunInput::prompt("go")).await.unwrap_err();

    assert!(matches!(&error, RunError::Tool { name, .. } if name == "missing"));
    assert!(error.to_string().contains("Tool not found: missing"));
}

// ---------- step budget ----------

#[tokio::test]
async fn test_step_budget_is_exact_and_terminal() {
    let model = Arc::new(ToolLoopModel {
        calls: AtomicU32::new(0),
    });
    let echo_calls = Arc::new(AtomicU32::new(0));
    let registry = registry_of(vec![AgentDefinition::new("churner", "m").with_tools(["echo"])]);
    let runner = AgentRunner::new(registry, tools_with_echo(echo_calls.clone()), model.clone())
        .with_config(RunConfig::default().with_max_steps(3));

    let outcome = runner.run("churner", RunInput::prompt("go")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::StepBudgetExhausted);
    assert_eq!(outcome.steps, 3);
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    // The final turn's requested tools never run: budget spent on the call.
    assert_eq!(echo_calls.load(Ordering::SeqCst), 2);
    // Output still resolves best-effort.
    assert_eq!(outcome.output.as_text(), Some("working on step 3"));
}

#[tokio::test]
async fn test_definition_max_steps_overrides_config() {
    let model = Arc::new(ToolLoopModel {
        calls: AtomicU32::new(0),
    });
    let echo_calls = Arc::new(AtomicU32::new(0));
    let registry = registry_of(vec![
        AgentDefinition::new("brief", "m")
            .with_tools(["echo"])
            .with_max_steps(1),
    ]);
    let runner = AgentRunner::new(registry, tools_with_echo(echo_calls.clone()), model.clone());

    let outcome = runner.run("brief", RunInput::prompt("go")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::StepBudgetExhausted);
    assert_eq!(outcome.steps, 1);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert_eq!(echo_calls.load(Ordering::SeqCst), 0);
}

// ---------- run-control builtins ----------

#[tokio::test]
async fn test_set_output_resolves_structured_mode() {
    let model = Arc::new(ScriptedModel::new([
        tool_response("c1", "set_output", json!({"output": {"score": 7}})),
        text_response("graded"),
    ]));
    let definition = AgentDefinition::new("grader", "m")
        .with_tools(["set_output"])
        .with_output_mode(OutputMode::StructuredOutput)
        .with_output_schema(json!({
            "type": "object",
            "required": ["score"],
            "properties": {"score": {"type": "integer"}}
        }));
    let registry = registry_of(vec![definition]);
    let (tx, mut rx) = mpsc::channel(256);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model).with_event_tx(tx);

    let outcome = runner.run("grader", RunInput::prompt("grade it")).await.unwrap();

    assert_eq!(outcome.output.as_structured(), Some(&json!({"score": 7})));
    let labels: Vec<&str> = drain(&mut rx).iter().map(event_label).collect();
    assert!(labels.contains(&"output_set"));
}

#[tokio::test]
async fn test_missing_structured_output_is_error() {
    let model = Arc::new(ScriptedModel::new([text_response("forgot to record")]));
    let definition = AgentDefinition::new("grader", "m")
        .with_output_mode(OutputMode::StructuredOutput)
        .with_output_schema(json!({"type": "object"}));
    let registry = registry_of(vec![definition]);
    let (tx, mut rx) = mpsc::channel(256);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model).with_event_tx(tx);

    let error = runner.run("grader", RunInput::prompt("grade it")).await.unwrap_err();

    assert!(matches!(&error, RunError::MissingStructuredOutput { agent_id, .. } if agent_id == "grader"));
    let events = drain(&mut rx);
    match events.last().unwrap() {
        RunEvent::RunFailed { error, .. } => {
            assert!(error.contains("without setting structured output"));
        }
        event => panic!("expected run_failed last, got {event:?}"),
    }
}

#[tokio::test]
async fn test_set_messages_replaces_history_wholesale() {
    let replacement = json!({
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": "fresh start"}]}
        ]
    });
    let model = Arc::new(ScriptedModel::new([
        tool_response("c1", "set_messages", replacement),
        text_response("after reset"),
    ]));
    let registry = registry_of(vec![
        AgentDefinition::new("compactor", "m").with_tools(["set_messages"]),
    ]);
    let (tx, mut rx) = mpsc::channel(256);
    let runner =
        AgentRunner::new(registry, Arc::new(base_tools()), model.clone()).with_event_tx(tx);

    let outcome = runner
        .run("compactor", RunInput::prompt("long scaffolding"))
        .await
        .unwrap();

    // The next completion sees exactly the replacement list, nothing else.
    assert_eq!(model.request(1).messages, vec![Message::user("fresh start")]);
    assert_eq!(
        outcome.messages,
        vec![Message::user("fresh start"), Message::assistant("after reset")]
    );
    let labels: Vec<&str> = drain(&mut rx).iter().map(event_label).collect();
    assert!(labels.contains(&"messages_replaced"));
}

// ---------- spawning ----------

#[tokio::test(start_paused = true)]
async fn test_spawn_results_ordered_with_failure_isolated() {
    let model = Arc::new(FamilyModel::new([
        tool_response("s1", "spawn_agents", spawn_args(&["alpha", "beta", "gamma"])),
        text_response("combined"),
    ]));
    let registry = registry_of(vec![
        parent_def(&["alpha", "beta", "gamma"]),
        AgentDefinition::new("alpha", "delay:10"),
        AgentDefinition::new("beta", "fail"),
        AgentDefinition::new("gamma", "delay:5"),
    ]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model);

    let outcome = runner.run("lead", RunInput::prompt("go")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ModelStop);
    let results = spawn_results(&outcome.messages);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["status"], "completed");
    assert_eq!(results[0]["agent_id"], "alpha");
    assert_eq!(results[1]["status"], "failed");
    assert_eq!(results[1]["agent_id"], "beta");
    assert!(
        results[1]["error"]
            .as_str()
            .unwrap()
            .contains("invalid request: scripted failure")
    );
    assert_eq!(results[2]["status"], "completed");
    assert_eq!(results[2]["agent_id"], "gamma");
}

#[tokio::test(start_paused = true)]
async fn test_spawned_children_run_concurrently() {
    let model = Arc::new(FamilyModel::new([
        tool_response("s1", "spawn_agents", spawn_args(&["alpha", "beta", "gamma"])),
        text_response("combined"),
    ]));
    let registry = registry_of(vec![
        parent_def(&["alpha", "beta", "gamma"]),
        AgentDefinition::new("alpha", "delay:10"),
        AgentDefinition::new("beta", "delay:50"),
        AgentDefinition::new("gamma", "delay:5"),
    ]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model);

    let started = tokio::time::Instant::now();
    runner.run("lead", RunInput::prompt("go")).await.unwrap();
    let elapsed = started.elapsed();

    // Concurrent children take as long as the slowest one, not the sum.
    assert!(elapsed >= Duration::from_millis(50), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(65), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_spawn_batch_with_undeclared_agent_rejected_atomically() {
    let model = Arc::new(FamilyModel::new([tool_response(
        "s1",
        "spawn_agents",
        spawn_args(&["alpha", "omega"]),
    )]));
    let registry = registry_of(vec![
        parent_def(&["alpha"]),
        AgentDefinition::new("alpha", "alpha-model"),
    ]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone());

    let error = runner.run("lead", RunInput::prompt("go")).await.unwrap_err();

    assert!(
        matches!(&error, RunError::SpawnNotDeclared { agent_ids, .. } if agent_ids == &["omega".to_string()])
    );
    assert!(error.is_capability_violation());
    // The declared sibling never started either.
    assert_eq!(model.child_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_spawned_agent_fails_in_band() {
    let model = Arc::new(FamilyModel::new([
        tool_response("s1", "spawn_agents", spawn_args(&["alpha", "phantom"])),
        text_response("combined"),
    ]));
    // "phantom" is declared spawnable but has no registered definition.
    let registry = registry_of(vec![
        parent_def(&["alpha", "phantom"]),
        AgentDefinition::new("alpha", "alpha-model"),
    ]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model);

    let outcome = runner.run("lead", RunInput::prompt("go")).await.unwrap();

    let results = spawn_results(&outcome.messages);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["status"], "completed");
    assert_eq!(results[1]["status"], "failed");
    assert!(
        results[1]["error"]
            .as_str()
            .unwrap()
            .contains("Unknown agent: phantom")
    );
}

#[tokio::test]
async fn test_child_seeding_follows_child_definition_flags() {
    let model = Arc::new(FamilyModel::new([
        tool_response("s1", "spawn_agents", spawn_args(&["copier", "fresh"])),
        text_response("combined"),
    ]));
    let mut copier = AgentDefinition::new("copier", "copier-model");
    copier.include_message_history = true;
    copier.inherit_system_prompt = true;
    let fresh = AgentDefinition::new("fresh", "fresh-model");
    let registry = registry_of(vec![
        parent_def(&["copier", "fresh"]).with_system_prompt("Lead the team"),
        copier,
        fresh,
    ]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone());

    runner
        .run("lead", RunInput::prompt("orchestrate the task"))
        .await
        .unwrap();

    // Opted in: parent history (without the pending tool use) plus own task.
    let copier_request = &model.requests_for("copier-model")[0];
    assert_eq!(copier_request.system_prompt.as_deref(), Some("Lead the team"));
    let texts: Vec<String> = copier_request.messages.iter().map(Message::text).collect();
    assert_eq!(texts, vec!["orchestrate the task", "task for copier"]);

    // Defaults: fresh context, no inherited prompt.
    let fresh_request = &model.requests_for("fresh-model")[0];
    assert!(fresh_request.system_prompt.is_none());
    assert_eq!(fresh_request.messages.len(), 1);
    assert_eq!(fresh_request.messages[0].text(), "task for fresh");
}

// ---------- cancellation ----------

#[tokio::test]
async fn test_cancellation_fails_run() {
    let token = CancellationToken::new();
    let registry = registry_of(vec![AgentDefinition::new("solo", "m")]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), Arc::new(PendingModel))
        .with_cancel_token(token.clone());

    let handle = tokio::spawn(async move { runner.run("solo", RunInput::prompt("hi")).await });
    tokio::task::yield_now().await;
    token.cancel();

    let error = handle.await.unwrap().unwrap_err();
    assert!(error.is_cancelled());
}

#[tokio::test]
async fn test_cancellation_reaches_spawned_children() {
    let token = CancellationToken::new();
    let model = Arc::new(FamilyModel::new([tool_response(
        "s1",
        "spawn_agents",
        spawn_args(&["hanger"]),
    )]));
    let registry = registry_of(vec![
        parent_def(&["hanger"]),
        AgentDefinition::new("hanger", "hang"),
    ]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model)
        .with_cancel_token(token.clone());

    let handle = tokio::spawn(async move { runner.run("lead", RunInput::prompt("go")).await });
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    token.cancel();

    let error = handle.await.unwrap().unwrap_err();
    assert!(error.is_cancelled());
}

// ---------- retries and events ----------

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_and_emits_events() {
    let model = Arc::new(FlakyModel {
        failures: 2,
        calls: AtomicU32::new(0),
    });
    let registry = registry_of(vec![AgentDefinition::new("solo", "m")]);
    let (tx, mut rx) = mpsc::channel(256);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone())
        .with_config(RunConfig::default().with_retry(
            RetryConfig::default().with_max_attempts(3).with_base_delay_ms(10),
        ))
        .with_event_tx(tx);

    let outcome = runner.run("solo", RunInput::prompt("hi")).await.unwrap();

    // Three attempts, one step.
    assert_eq!(outcome.steps, 1);
    assert_eq!(outcome.output.as_text(), Some("recovered"));
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);

    let retries: Vec<(u32, u64)> = drain(&mut rx)
        .iter()
        .filter_map(|event| match event {
            RunEvent::ModelCallRetrying {
                attempt, delay_ms, ..
            } => Some((*attempt, *delay_ms)),
            _ => None,
        })
        .collect();
    assert_eq!(retries.len(), 2);
    assert_eq!(retries[0].0, 1);
    assert!((8..=12).contains(&retries[0].1), "delay {}", retries[0].1);
    assert_eq!(retries[1].0, 2);
    assert!((16..=24).contains(&retries[1].1), "delay {}", retries[1].1);
}

#[tokio::test]
async fn test_retries_exhausted_fails_run() {
    let model = Arc::new(FlakyModel {
        failures: u32::MAX,
        calls: AtomicU32::new(0),
    });
    let registry = registry_of(vec![AgentDefinition::new("solo", "m")]);
    let runner = AgentRunner::new(registry, Arc::new(base_tools()), model.clone()).with_config(
        RunConfig::default().with_retry(RetryConfig::no_retry()),
    );

    let error = runner.run("solo", RunInput::prompt("hi")).await.unwrap_err();

    assert!(matches!(error, RunError::Provider { .. }));
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_events_emitted_in_order() {
    let model = Arc::new(ScriptedModel::new([
        tool_response("c1", "echo", json!({})),
        text_response("finished"),
    ]));
    let echo_calls = Arc::new(AtomicU32::new(0));
    let registry = registry_of(vec![AgentDefinition::new("worker", "m").with_tools(["echo"])]);
    let (tx, mut rx) = mpsc::channel(256);
    let runner =
        AgentRunner::new(registry, tools_with_echo(echo_calls), model).with_event_tx(tx);

    runner.run("worker", RunInput::prompt("go")).await.unwrap();

    let labels: Vec<&str> = drain(&mut rx).iter().map(event_label).collect();
    assert_eq!(
        labels,
        vec![
            "run_started",
            "step_started",
            "model_call_completed",
            "tool_call_started",
            "tool_call_completed",
            "step_started",
            "model_call_completed",
            "assistant_message",
            "run_completed",
        ]
    );
}

// ---------- step programs ----------

/// Scripted program: inject text, take one step, call a tool, finish.
struct RecordingProgram {
    phase: u8,
    seen: Arc<Mutex<Vec<String>>>,
}

fn outcome_label(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Started => "started".to_string(),
        StepOutcome::Stepped(report) => {
            let suffix = if report.budget_exhausted { ":budget" } else { "" };
            format!("stepped:{}{suffix}", report.steps_taken)
        }
        StepOutcome::ToolCalled(result) => format!("tool:{}", result.name),
        StepOutcome::TextEmitted => "text".to_string(),
    }
}

impl StepProgram for RecordingProgram {
    fn resume(&mut self, outcome: StepOutcome) -> ProgramStep {
        self.seen.lock().unwrap().push(outcome_label(&outcome));
        self.phase += 1;
        match self.phase {
            1 => ProgramStep::Signal(StepSignal::StepText("Planning the approach.".to_string())),
            2 => ProgramStep::Signal(StepSignal::Step),
            3 => ProgramStep::Signal(StepSignal::CallTool {
                name: "echo".to_string(),
                input: json!({}),
            }),
            _ => ProgramStep::Finished,
        }
    }
}

/// Steps all the way, then greedily asks for one more.
struct GreedyProgram {
    seen: Arc<Mutex<Vec<String>>>,
}

impl StepProgram for GreedyProgram {
    fn resume(&mut self, outcome: StepOutcome) -> ProgramStep {
        self.seen.lock().unwrap().push(outcome_label(&outcome));
        match outcome {
            StepOutcome::Started => ProgramStep::Signal(StepSignal::StepAll),
            _ => ProgramStep::Signal(StepSignal::Step),
        }
    }
}

#[tokio::test]
async fn test_step_program_drives_run() {
    let model = Arc::new(ScriptedModel::new([text_response("step response")]));
    let echo_calls = Arc::new(AtomicU32::new(0));
    let registry = registry_of(vec![AgentDefinition::new("scripted", "m").with_tools(["echo"])]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let program_seen = seen.clone();
    let runner = AgentRunner::new(registry, tools_with_echo(echo_calls.clone()), model.clone())
        .with_step_program("scripted", move || {
            Box::new(RecordingProgram {
                phase: 0,
                seen: program_seen.clone(),
            })
        });

    let outcome = runner.run("scripted", RunInput::prompt("drive")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ProgramComplete);
    assert_eq!(outcome.steps, 1);
    assert_eq!(model.calls(), 1);
    assert_eq!(echo_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["started", "text", "stepped:1", "tool:echo"]
    );

    let roles: Vec<Role> = outcome.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Assistant, Role::Tool]
    );
    assert_eq!(outcome.messages[1].text(), "Planning the approach.");
    assert_eq!(outcome.messages[2].text(), "step response");
}

#[tokio::test]
async fn test_step_program_sees_budget_exhaustion_and_terminates() {
    let model = Arc::new(ToolLoopModel {
        calls: AtomicU32::new(0),
    });
    let echo_calls = Arc::new(AtomicU32::new(0));
    let registry = registry_of(vec![
        AgentDefinition::new("greedy", "m")
            .with_tools(["echo"])
            .with_max_steps(2),
    ]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let program_seen = seen.clone();
    let runner = AgentRunner::new(registry, tools_with_echo(echo_calls), model.clone())
        .with_step_program("greedy", move || {
            Box::new(GreedyProgram {
                seen: program_seen.clone(),
            })
        });

    let outcome = runner.run("greedy", RunInput::prompt("go")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::StepBudgetExhausted);
    assert_eq!(outcome.steps, 2);
    assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    // The trailing Step signal terminated without another model call.
    assert_eq!(*seen.lock().unwrap(), vec!["started", "stepped:2:budget"]);
}

// ---------- helpers ----------

#[test]
fn test_compose_initial_message_orders_sections() {
    let definition =
        AgentDefinition::new("a", "m").with_instructions_prompt("Keep it short.");
    let input = RunInput::prompt("Find the bug").with_params(json!({"file": "main.rs"}));

    let message = compose_initial_message(&input, &definition).unwrap();

    let prompt_at = message.find("Find the bug").unwrap();
    let instructions_at = message.find("Keep it short.").unwrap();
    let params_at = message.find("Input parameters:").unwrap();
    assert!(prompt_at < instructions_at);
    assert!(instructions_at < params_at);
}

#[test]
fn test_compose_initial_message_empty_input() {
    let definition = AgentDefinition::new("a", "m");
    assert!(compose_initial_message(&RunInput::default(), &definition).is_none());
}

#[test]
fn test_spawn_snapshot_strips_pending_tool_use() {
    let mut history = MessageHistory::new();
    history.push(Message::user("q"));
    history.push(Message::new(
        Role::Assistant,
        vec![
            ContentPart::text("spawning"),
            ContentPart::tool_use("s1", "spawn_agents", json!({})),
        ],
    ));

    let snapshot = spawn_snapshot(&history);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].text(), "q");
}

#[test]
fn test_spawn_snapshot_keeps_complete_history() {
    let mut history = MessageHistory::new();
    history.push(Message::user("q"));
    history.push(Message::assistant("plain answer"));

    let snapshot = spawn_snapshot(&history);
    assert_eq!(snapshot.len(), 2);
}
