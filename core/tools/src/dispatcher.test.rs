use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use ensemble_protocol::ConcurrencySafety;

use super::*;
use crate::tool::Tool;

/// Counts invocations so tests can prove a handler never ran.
struct CountingTool {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        "counting"
    }
    fn description(&self) -> &str {
        "Counts its own invocations"
    }
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolOutput::text("counted"))
    }
}

/// Sleeps for `ms` milliseconds, then echoes its call input.
struct SleepTool;

#[async_trait]
impl Tool for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }
    fn description(&self) -> &str {
        "Sleeps for the given number of milliseconds"
    }
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
        let ms = input["ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ToolOutput::text(format!("slept {ms}ms")))
    }
}

/// Records execution order into a shared log.
struct LoggingTool {
    tool_name: &'static str,
    safety: ConcurrencySafety,
    sleep_ms: u64,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Tool for LoggingTool {
    fn name(&self) -> &str {
        self.tool_name
    }
    fn description(&self) -> &str {
        "Appends to a shared execution log"
    }
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }
    fn concurrency_safety(&self) -> ConcurrencySafety {
        self.safety
    }
    async fn execute(&self, _input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
        if self.sleep_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.sleep_ms)).await;
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("{} done", self.tool_name));
        Ok(ToolOutput::text("logged"))
    }
}

fn dispatcher_with(
    registry: ToolRegistry,
    declared: &[&str],
    config: DispatcherConfig,
) -> ToolDispatcher {
    ToolDispatcher::new(Arc::new(registry), config, RunId::from("run-1"), "lead")
        .with_declared_tools(declared.iter().map(|s| s.to_string()))
}

#[tokio::test]
async fn test_undeclared_tool_rejects_batch_before_any_execution() {
    let calls_made = Arc::new(AtomicU32::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(CountingTool {
        calls: calls_made.clone(),
    });

    // "counting" is declared and registered; "missing" is neither
    let dispatcher = dispatcher_with(registry, &["counting"], DispatcherConfig::default());

    let calls = vec![
        ToolCall::new("call-1", "counting", serde_json::json!({})),
        ToolCall::new("call-2", "missing", serde_json::json!({})),
    ];
    let err = dispatcher.dispatch(calls).await.unwrap_err();

    assert!(err.to_string().contains("Tool not declared by agent: missing"));
    assert!(err.is_capability_violation());
    // The declared handler must not have run either
    assert_eq!(calls_made.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_registered_but_undeclared_tool_still_rejected() {
    let calls_made = Arc::new(AtomicU32::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(CountingTool {
        calls: calls_made.clone(),
    });

    // Handler exists in the registry but the agent never declared it
    let dispatcher = dispatcher_with(registry, &[], DispatcherConfig::default());

    let calls = vec![ToolCall::new("call-1", "counting", serde_json::json!({}))];
    let err = dispatcher.dispatch(calls).await.unwrap_err();

    assert!(err.to_string().contains("Tool not declared by agent: counting"));
    assert_eq!(calls_made.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_declared_tool_without_handler_fails_batch() {
    let calls_made = Arc::new(AtomicU32::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(CountingTool {
        calls: calls_made.clone(),
    });

    // "ghost" is declared but has no registered handler
    let dispatcher = dispatcher_with(registry, &["counting", "ghost"], DispatcherConfig::default());

    let calls = vec![
        ToolCall::new("call-1", "counting", serde_json::json!({})),
        ToolCall::new("call-2", "ghost", serde_json::json!({})),
    ];
    let err = dispatcher.dispatch(calls).await.unwrap_err();

    assert!(err.to_string().contains("Tool not found: ghost"));
    assert_eq!(calls_made.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_results_come_back_in_input_order() {
    let mut registry = ToolRegistry::new();
    registry.register(SleepTool);

    let dispatcher = dispatcher_with(registry, &["sleep"], DispatcherConfig::default());

    // Slowest call first: completion order is call-2, call-3, call-1
    let calls = vec![
        ToolCall::new("call-1", "sleep", serde_json::json!({"ms": 50})),
        ToolCall::new("call-2", "sleep", serde_json::json!({"ms": 5})),
        ToolCall::new("call-3", "sleep", serde_json::json!({"ms": 10})),
    ];
    let results = dispatcher.dispatch(calls).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
    assert_eq!(ids, vec!["call-1", "call-2", "call-3"]);
    assert!(results.iter().all(|r| r.result.is_ok()));
}

#[tokio::test(start_paused = true)]
async fn test_safe_calls_overlap() {
    let mut registry = ToolRegistry::new();
    registry.register(SleepTool);

    let dispatcher = dispatcher_with(registry, &["sleep"], DispatcherConfig::default());

    let calls = vec![
        ToolCall::new("call-1", "sleep", serde_json::json!({"ms": 40})),
        ToolCall::new("call-2", "sleep", serde_json::json!({"ms": 40})),
        ToolCall::new("call-3", "sleep", serde_json::json!({"ms": 40})),
    ];

    let start = tokio::time::Instant::now();
    let results = dispatcher.dispatch(calls).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 3);
    // Concurrent execution: total time tracks the slowest call, not the sum
    assert!(elapsed < Duration::from_millis(100), "elapsed: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_unsafe_tool_waits_for_inflight_work() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ToolRegistry::new();
    registry.register(LoggingTool {
        tool_name: "safe_slow",
        safety: ConcurrencySafety::Safe,
        sleep_ms: 30,
        log: log.clone(),
    });
    registry.register(LoggingTool {
        tool_name: "unsafe_fast",
        safety: ConcurrencySafety::Unsafe,
        sleep_ms: 0,
        log: log.clone(),
    });

    let dispatcher = dispatcher_with(
        registry,
        &["safe_slow", "unsafe_fast"],
        DispatcherConfig::default(),
    );

    let calls = vec![
        ToolCall::new("call-1", "safe_slow", serde_json::json!({})),
        ToolCall::new("call-2", "unsafe_fast", serde_json::json!({})),
    ];
    let results = dispatcher.dispatch(calls).await.unwrap();

    assert_eq!(results.len(), 2);
    let order = log.lock().unwrap().clone();
    // The unsafe tool must not start until the slow safe tool finished
    assert_eq!(order, vec!["safe_slow done", "unsafe_fast done"]);
}

struct StrictTool;

#[async_trait]
impl Tool for StrictTool {
    fn name(&self) -> &str {
        "strict"
    }
    fn description(&self) -> &str {
        "Requires a query string"
    }
    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }
    async fn execute(&self, input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
        let query = input["query"].as_str().unwrap_or_default();
        Ok(ToolOutput::text(format!("searched: {query}")))
    }
}

#[tokio::test]
async fn test_invalid_input_is_a_per_call_error() {
    let mut registry = ToolRegistry::new();
    registry.register(StrictTool);

    let dispatcher = dispatcher_with(registry, &["strict"], DispatcherConfig::default());

    let calls = vec![
        ToolCall::new("call-1", "strict", serde_json::json!({"query": "rust"})),
        ToolCall::new("call-2", "strict", serde_json::json!({})),
    ];
    let results = dispatcher.dispatch(calls).await.unwrap();

    assert!(results[0].result.is_ok());
    let err = results[1].result.as_ref().unwrap_err();
    assert!(err.to_string().contains("missing required field"));
    assert!(!err.is_capability_violation());
}

#[tokio::test(start_paused = true)]
async fn test_tool_timeout_is_a_per_call_error() {
    let mut registry = ToolRegistry::new();
    registry.register(SleepTool);

    let config = DispatcherConfig {
        default_timeout_secs: 1,
        ..DispatcherConfig::default()
    };
    let dispatcher = dispatcher_with(registry, &["sleep"], config);

    let calls = vec![ToolCall::new(
        "call-1",
        "sleep",
        serde_json::json!({"ms": 5_000}),
    )];
    let results = dispatcher.dispatch(calls).await.unwrap();

    let err = results[0].result.as_ref().unwrap_err();
    assert!(err.to_string().contains("Timeout after 1s"));
}

struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panicking"
    }
    fn description(&self) -> &str {
        "Panics on execution"
    }
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
        panic!("tool blew up");
    }
}

#[tokio::test]
async fn test_panicking_tool_contained_as_internal_error() {
    let mut registry = ToolRegistry::new();
    registry.register(PanickingTool);
    registry.register(SleepTool);

    let dispatcher = dispatcher_with(registry, &["panicking", "sleep"], DispatcherConfig::default());

    let calls = vec![
        ToolCall::new("call-1", "panicking", serde_json::json!({})),
        ToolCall::new("call-2", "sleep", serde_json::json!({"ms": 0})),
    ];
    let results = dispatcher.dispatch(calls).await.unwrap();

    assert_eq!(results[0].call_id, "call-1");
    assert_eq!(results[0].name, "<panicked:call-1>");
    let err = results[0].result.as_ref().unwrap_err();
    assert!(err.to_string().contains("panicked"));
    // The sibling call is unaffected
    assert!(results[1].result.is_ok());
}

#[tokio::test]
async fn test_cancelled_token_short_circuits_calls() {
    let calls_made = Arc::new(AtomicU32::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(CountingTool {
        calls: calls_made.clone(),
    });

    let token = CancellationToken::new();
    token.cancel();

    let dispatcher = dispatcher_with(registry, &["counting"], DispatcherConfig::default())
        .with_cancel_token(token);

    let calls = vec![ToolCall::new("call-1", "counting", serde_json::json!({}))];
    let results = dispatcher.dispatch(calls).await.unwrap();

    let err = results[0].result.as_ref().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(calls_made.load(Ordering::SeqCst), 0);
}

struct VerboseTool;

#[async_trait]
impl Tool for VerboseTool {
    fn name(&self) -> &str {
        "verbose"
    }
    fn description(&self) -> &str {
        "Returns a very long output"
    }
    fn input_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }
    async fn execute(&self, _input: Value, _ctx: &mut ToolContext) -> Result<ToolOutput> {
        Ok(ToolOutput::text("x".repeat(10_000)))
    }
}

#[tokio::test]
async fn test_oversized_output_truncated() {
    let mut registry = ToolRegistry::new();
    registry.register(VerboseTool);

    let config = DispatcherConfig {
        max_output_chars: 1_000,
        ..DispatcherConfig::default()
    };
    let dispatcher = dispatcher_with(registry, &["verbose"], config);

    let calls = vec![ToolCall::new("call-1", "verbose", serde_json::json!({}))];
    let results = dispatcher.dispatch(calls).await.unwrap();

    let output = results[0].result.as_ref().unwrap();
    let text = output.content.to_text();
    assert!(text.len() < 2_000);
    assert!(text.contains("output truncated"));
}

#[tokio::test]
async fn test_started_and_completed_events_emitted() {
    let mut registry = ToolRegistry::new();
    registry.register(SleepTool);

    let (tx, mut rx) = mpsc::channel(16);
    let dispatcher =
        dispatcher_with(registry, &["sleep"], DispatcherConfig::default()).with_event_tx(tx);

    let calls = vec![ToolCall::new("call-1", "sleep", serde_json::json!({"ms": 0}))];
    dispatcher.dispatch(calls).await.unwrap();

    let first = rx.try_recv().unwrap();
    assert!(matches!(
        first,
        RunEvent::ToolCallStarted { ref call_id, .. } if call_id == "call-1"
    ));
    let second = rx.try_recv().unwrap();
    assert!(matches!(
        second,
        RunEvent::ToolCallCompleted { ref call_id, is_error: false, .. } if call_id == "call-1"
    ));
}

#[tokio::test]
async fn test_empty_batch_returns_empty_results() {
    let dispatcher = dispatcher_with(ToolRegistry::new(), &[], DispatcherConfig::default());
    let results = dispatcher.dispatch(Vec::new()).await.unwrap();
    assert!(results.is_empty());
}
