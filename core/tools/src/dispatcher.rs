//! Batch tool dispatcher.
//!
//! Executes the tool calls requested by one assistant turn. Concurrency-safe
//! tools are spawned in parallel (up to a bounded limit); unsafe tools wait
//! for all in-flight work to drain and then run alone. Results are returned
//! in the order the calls were given, regardless of completion order.
//!
//! Capability checks run before anything executes: if any call in the batch
//! names a tool outside the agent's declared set, the whole batch is rejected
//! and no handler runs.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ensemble_protocol::RunEvent;
use ensemble_protocol::RunId;
use ensemble_protocol::ToolCall;
use ensemble_protocol::ToolOutput;
use ensemble_protocol::ValidationResult;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;

use crate::context::AgentSpawner;
use crate::context::ToolContext;
use crate::error::Result;
use crate::registry::ToolRegistry;
use crate::tool::Tool;

/// Default maximum concurrent tool executions.
pub const DEFAULT_MAX_TOOL_CONCURRENCY: i32 = 10;

/// Configuration for the tool dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum concurrent tool executions.
    ///
    /// Configurable via `ENSEMBLE_MAX_TOOL_CONCURRENCY` environment variable.
    /// Default: 10.
    pub max_concurrency: i32,
    /// Default timeout for tool execution (seconds).
    pub default_timeout_secs: i64,
    /// Cap on tool output size (characters). Oversized text output is
    /// truncated, keeping the start and end.
    pub max_output_chars: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        // Check environment variable for max concurrency override
        let max_concurrency = std::env::var("ENSEMBLE_MAX_TOOL_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_TOOL_CONCURRENCY);

        Self {
            max_concurrency,
            default_timeout_secs: 120,
            max_output_chars: 100_000,
        }
    }
}

/// Result from a single tool call.
#[derive(Debug)]
pub struct ToolCallResult {
    /// Tool call ID.
    pub call_id: String,
    /// Tool name.
    pub name: String,
    /// Execution result.
    pub result: Result<ToolOutput>,
}

/// Dispatches the tool calls of one step for one agent.
///
/// A dispatcher is scoped to a single run: it carries the agent's declared
/// tool set, the run's cancellation token, and the spawner handle that
/// built-in tools use to launch child runs.
///
/// # Example
///
/// ```ignore
/// let dispatcher = ToolDispatcher::new(registry, DispatcherConfig::default(), run_id, "lead")
///     .with_declared_tools(["search".to_string(), "spawn_agents".to_string()]);
/// let results = dispatcher.dispatch(tool_calls).await?;
/// ```
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    config: DispatcherConfig,
    /// Tools the agent declared. Calls outside this set reject the batch.
    declared_tools: HashSet<String>,
    run_id: RunId,
    agent_id: String,
    output_schema: Option<Value>,
    spawnable_agents: Vec<String>,
    spawner: Option<Arc<dyn AgentSpawner>>,
    event_tx: Option<mpsc::Sender<RunEvent>>,
    cancel_token: CancellationToken,
}

impl ToolDispatcher {
    /// Create a dispatcher for one run.
    pub fn new(
        registry: Arc<ToolRegistry>,
        config: DispatcherConfig,
        run_id: RunId,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            config,
            declared_tools: HashSet::new(),
            run_id,
            agent_id: agent_id.into(),
            output_schema: None,
            spawnable_agents: Vec::new(),
            spawner: None,
            event_tx: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Set the agent's declared tool names.
    pub fn with_declared_tools(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.declared_tools = names.into_iter().collect();
        self
    }

    /// Set the event channel.
    pub fn with_event_tx(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Set the cancellation token.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Set the structured output schema handed to `set_output`.
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Set the agents the run may spawn.
    pub fn with_spawnable_agents(mut self, agents: Vec<String>) -> Self {
        self.spawnable_agents = agents;
        self
    }

    /// Set the spawner handle for `spawn_agents`.
    pub fn with_spawner(mut self, spawner: Arc<dyn AgentSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Execute a batch of tool calls and return results in input order.
    ///
    /// Every call is checked against the declared tool set and the registry
    /// before any handler runs; an undeclared or unregistered name fails the
    /// whole batch with no execution. Per-call failures after that point are
    /// reported in the returned results, not as an error from this method.
    pub async fn dispatch(&self, calls: Vec<ToolCall>) -> Result<Vec<ToolCallResult>> {
        for call in &calls {
            if !self.declared_tools.contains(&call.name) {
                debug!(call_id = %call.id, name = %call.name, "tool not declared, rejecting batch");
                return Err(crate::error::tool_error::NotDeclaredSnafu {
                    name: call.name.clone(),
                }
                .build());
            }
            if !self.registry.has(&call.name) {
                return Err(crate::error::tool_error::NotFoundSnafu {
                    name: call.name.clone(),
                }
                .build());
            }
        }

        let order: Vec<String> = calls.iter().map(|c| c.id.clone()).collect();
        let mut results: HashMap<String, ToolCallResult> = HashMap::new();
        let mut active: Vec<(String, JoinHandle<ToolCallResult>)> = Vec::new();

        for call in calls {
            let is_safe = self
                .registry
                .get(&call.name)
                .map(|tool| tool.is_concurrent_safe())
                .unwrap_or(false);

            if is_safe {
                // Safe tool: spawn concurrently (respecting max_concurrency)
                if active.len() >= self.config.max_concurrency as usize {
                    self.drain_one(&mut active, &mut results).await;
                }
                self.emit_started(&call).await;
                let call_id = call.id.clone();
                active.push((call_id, self.spawn_execution(call)));
            } else {
                // Unsafe tool: drain all in-flight work, then run alone
                self.drain_all(&mut active, &mut results).await;
                self.emit_started(&call).await;
                let result = self.execute_inline(call).await;
                self.emit_completed(&result).await;
                results.insert(result.call_id.clone(), result);
            }
        }

        self.drain_all(&mut active, &mut results).await;

        let mut ordered = Vec::with_capacity(order.len());
        for call_id in order {
            if let Some(result) = results.remove(&call_id) {
                ordered.push(result);
            }
        }
        Ok(ordered)
    }

    /// Spawn a concurrency-safe tool call onto the runtime.
    fn spawn_execution(&self, call: ToolCall) -> JoinHandle<ToolCallResult> {
        let registry = self.registry.clone();
        let ctx = self.create_context(&call.id);
        let timeout_secs = self.config.default_timeout_secs;
        let max_output_chars = self.config.max_output_chars;

        tokio::spawn(async move {
            let call_id = call.id.clone();
            let name = call.name.clone();
            let result = execute_tool(&registry, call, ctx, timeout_secs, max_output_chars).await;
            ToolCallResult {
                call_id,
                name,
                result,
            }
        })
    }

    /// Execute a concurrency-unsafe tool call inline.
    async fn execute_inline(&self, call: ToolCall) -> ToolCallResult {
        let call_id = call.id.clone();
        let name = call.name.clone();
        let ctx = self.create_context(&call.id);
        let result = execute_tool(
            &self.registry,
            call,
            ctx,
            self.config.default_timeout_secs,
            self.config.max_output_chars,
        )
        .await;
        ToolCallResult {
            call_id,
            name,
            result,
        }
    }

    /// Build the per-call execution context.
    fn create_context(&self, call_id: &str) -> ToolContext {
        let mut ctx = ToolContext::new(call_id, self.run_id.clone(), self.agent_id.clone())
            .with_cancel_token(self.cancel_token.clone())
            .with_spawnable_agents(self.spawnable_agents.clone());
        if let Some(tx) = &self.event_tx {
            ctx = ctx.with_event_tx(tx.clone());
        }
        if let Some(schema) = &self.output_schema {
            ctx = ctx.with_output_schema(schema.clone());
        }
        if let Some(spawner) = &self.spawner {
            ctx = ctx.with_spawner(spawner.clone());
        }
        ctx
    }

    /// Await every active task and record its result.
    async fn drain_all(
        &self,
        active: &mut Vec<(String, JoinHandle<ToolCallResult>)>,
        results: &mut HashMap<String, ToolCallResult>,
    ) {
        for (call_id, handle) in active.drain(..) {
            let result = join_task(call_id, handle).await;
            self.emit_completed(&result).await;
            results.insert(result.call_id.clone(), result);
        }
    }

    /// Await the oldest active task and record its result.
    async fn drain_one(
        &self,
        active: &mut Vec<(String, JoinHandle<ToolCallResult>)>,
        results: &mut HashMap<String, ToolCallResult>,
    ) {
        if active.is_empty() {
            return;
        }
        let (call_id, handle) = active.remove(0);
        let result = join_task(call_id, handle).await;
        self.emit_completed(&result).await;
        results.insert(result.call_id.clone(), result);
    }

    /// Emit a run event.
    async fn emit_event(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.send(event).await {
                debug!("Failed to send tool event: {e}");
            }
        }
    }

    /// Emit a started event for a call.
    async fn emit_started(&self, call: &ToolCall) {
        self.emit_event(RunEvent::ToolCallStarted {
            run_id: self.run_id.to_string(),
            call_id: call.id.clone(),
            name: call.name.clone(),
        })
        .await;
    }

    /// Emit a completed event for a result.
    async fn emit_completed(&self, result: &ToolCallResult) {
        let is_error = match &result.result {
            Ok(output) => output.is_error,
            Err(_) => true,
        };
        self.emit_event(RunEvent::ToolCallCompleted {
            run_id: self.run_id.to_string(),
            call_id: result.call_id.clone(),
            name: result.name.clone(),
            is_error,
        })
        .await;
    }
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("config", &self.config)
            .field("agent_id", &self.agent_id)
            .field("declared_tools", &self.declared_tools)
            .finish_non_exhaustive()
    }
}

/// Resolve a spawned task, containing panics as in-band internal errors.
async fn join_task(call_id: String, handle: JoinHandle<ToolCallResult>) -> ToolCallResult {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            error!(call_id = %call_id, error = %e, "Tool task panicked");
            ToolCallResult {
                call_id: call_id.clone(),
                name: format!("<panicked:{call_id}>"),
                result: Err(crate::error::tool_error::InternalSnafu {
                    message: format!("Tool execution task panicked (call_id: {call_id}): {e}"),
                }
                .build()),
            }
        }
    }
}

/// Execute a single tool with timeout and cancellation support.
async fn execute_tool(
    registry: &ToolRegistry,
    tool_call: ToolCall,
    mut ctx: ToolContext,
    timeout_secs: i64,
    max_output_chars: usize,
) -> Result<ToolOutput> {
    let timeout_duration = Duration::from_secs(timeout_secs as u64);
    let cancel_token = ctx.cancel_token.clone();

    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            Err(crate::error::tool_error::CancelledSnafu.build())
        }
        result = tokio::time::timeout(
            timeout_duration,
            execute_tool_inner(registry, tool_call, &mut ctx, max_output_chars),
        ) => {
            match result {
                Ok(inner) => inner,
                Err(_) => Err(crate::error::tool_error::TimeoutSnafu { timeout_secs }.build()),
            }
        }
    }
}

/// Inner tool execution logic (without timeout).
async fn execute_tool_inner(
    registry: &ToolRegistry,
    tool_call: ToolCall,
    ctx: &mut ToolContext,
    max_output_chars: usize,
) -> Result<ToolOutput> {
    let name = &tool_call.name;
    let input = tool_call.arguments;

    let tool = registry
        .get(name)
        .ok_or_else(|| crate::error::tool_error::NotFoundSnafu { name: name.clone() }.build())?;

    // Validate input
    let validation = tool.validate(&input).await;
    if let ValidationResult::Invalid { errors } = validation {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(crate::error::tool_error::InvalidInputSnafu {
            message: error_msgs.join(", "),
        }
        .build());
    }

    // Execute, then cap oversized output
    let mut output = tool.execute(input, ctx).await?;
    output.truncate_to(max_output_chars);
    Ok(output)
}

#[cfg(test)]
#[path = "dispatcher.test.rs"]
mod tests;
