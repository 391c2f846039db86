//! The step executor that drives agent runs.
//!
//! [`AgentRunner`] is constructed once and drives any number of runs,
//! including the child runs started by `spawn_agents`. Each run's state is
//! exclusively owned by the future driving it; the runner itself only
//! holds shared read-only collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ensemble_message::MessageHistory;
use ensemble_protocol::ContentPart;
use ensemble_protocol::Message;
use ensemble_protocol::Role;
use ensemble_protocol::RunEvent;
use ensemble_protocol::RunModifier;
use ensemble_protocol::StopReason;
use ensemble_protocol::ToolCall;
use ensemble_provider::CompletionRequest;
use ensemble_provider::CompletionResponse;
use ensemble_provider::Model;
use ensemble_provider::ProviderError;
use ensemble_provider::RetryExecutor;
use ensemble_provider::RetryObserver;
use ensemble_registry::AgentDefinition;
use ensemble_registry::AgentRegistry;
use ensemble_tools::ToolCallResult;
use ensemble_tools::ToolDispatcher;
use ensemble_tools::ToolRegistry;
use snafu::IntoError;
use snafu::ResultExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use crate::config::RunConfig;
use crate::error::Result;
use crate::error::run_error;
use crate::error::run_error_from_tool;
use crate::outcome::RunInput;
use crate::outcome::RunOutcome;
use crate::output::resolve_output;
use crate::program::ProgramStep;
use crate::program::StepOutcome;
use crate::program::StepProgram;
use crate::program::StepProgramFactory;
use crate::program::StepReport;
use crate::program::StepSignal;
use crate::spawner::RunSpawner;
use crate::state::AgentRunState;

/// Seed state a parent hands to a spawned child run.
///
/// The runner applies each piece only when the child's definition opts in
/// (`include_message_history`, `inherit_system_prompt`); a top-level run
/// uses the default (empty) seed.
#[derive(Debug, Default)]
pub(crate) struct RunSeed {
    /// Parent history snapshot, applied when the child includes history.
    pub(crate) messages: Option<Vec<Message>>,
    /// Parent's effective system prompt, applied when the child inherits
    /// and declares none of its own.
    pub(crate) system_prompt: Option<String>,
    /// Run id of the spawning parent.
    pub(crate) parent_run_id: Option<String>,
}

/// Drives agent runs to a terminal state.
///
/// The runner holds the registries, the model handle, and the run
/// configuration; all of them are shared read-only across concurrent
/// runs. Step programs registered with
/// [`with_step_program`](AgentRunner::with_step_program) take over
/// control flow for their agent; every other agent uses the default
/// model-driven loop.
///
/// # Example
///
/// ```ignore
/// let runner = AgentRunner::new(registry, tools, model)
///     .with_config(RunConfig::default().with_max_steps(20));
/// let outcome = runner.run("researcher", RunInput::prompt("Dig in")).await?;
/// ```
#[derive(Clone)]
pub struct AgentRunner {
    registry: Arc<AgentRegistry>,
    tools: Arc<ToolRegistry>,
    model: Arc<dyn Model>,
    config: RunConfig,
    programs: HashMap<String, StepProgramFactory>,
    event_tx: Option<mpsc::Sender<RunEvent>>,
    cancel_token: CancellationToken,
}

impl AgentRunner {
    /// Create a runner over the given registries and model.
    pub fn new(
        registry: Arc<AgentRegistry>,
        tools: Arc<ToolRegistry>,
        model: Arc<dyn Model>,
    ) -> Self {
        Self {
            registry,
            tools,
            model,
            config: RunConfig::default(),
            programs: HashMap::new(),
            event_tx: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Set the run configuration.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the event channel for run progress notifications.
    pub fn with_event_tx(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Set the cancellation token observed by all runs.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Register a step program for an agent, keyed by resolved agent id.
    ///
    /// The factory produces a fresh program instance per run.
    pub fn with_step_program<F>(mut self, agent_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn StepProgram> + Send + Sync + 'static,
    {
        self.programs.insert(agent_id.into(), Arc::new(factory));
        self
    }

    /// Run an agent to a terminal state.
    ///
    /// Terminal means one of: the model stopped on its own, the step
    /// budget ran out, or a registered step program finished. All of
    /// those produce `Ok`; capability violations, provider failure after
    /// retries, and cancellation produce `Err`.
    pub async fn run(&self, agent_id: &str, input: RunInput) -> Result<RunOutcome> {
        self.run_at_depth(agent_id, input, RunSeed::default(), 0, self.cancel_token.clone())
            .await
    }

    /// Run an agent at the given spawn depth.
    ///
    /// Entry point for both top-level runs (depth 0, empty seed) and
    /// children spawned by [`RunSpawner`].
    pub(crate) async fn run_at_depth(
        &self,
        agent_id: &str,
        input: RunInput,
        seed: RunSeed,
        depth: u32,
        cancel_token: CancellationToken,
    ) -> Result<RunOutcome> {
        let definition = self.registry.resolve(agent_id).map_err(|_| {
            run_error::UnknownAgentSnafu {
                agent_id: agent_id.to_string(),
            }
            .build()
        })?;

        if let Some(message) = definition
            .validate_params(input.params.as_ref())
            .error_summary()
        {
            return run_error::SchemaValidationSnafu {
                agent_id: definition.id.clone(),
                message,
            }
            .fail();
        }

        let mut state = AgentRunState::new(definition.clone());
        state.params = input.params.clone();
        state.system_prompt = definition.system_prompt.clone();
        if state.system_prompt.is_none() && definition.inherit_system_prompt {
            state.system_prompt = seed.system_prompt;
        }
        if definition.include_message_history {
            if let Some(messages) = seed.messages {
                state.history = MessageHistory::with_messages(messages);
            }
        }
        if let Some(opening) = compose_initial_message(&input, &definition) {
            state.history.push(Message::user(opening));
        }

        let run_id = state.run_id.to_string();
        info!(agent_id = %definition.id, run_id = %run_id, depth, "run started");
        self.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            agent_id: definition.id.clone(),
            parent_run_id: seed.parent_run_id,
        })
        .await;

        let driven = match self.programs.get(&definition.id) {
            Some(factory) => {
                let program = factory();
                self.drive_program(program, &mut state, depth, &cancel_token)
                    .await
            }
            None => self.drive_default_loop(&mut state, depth, &cancel_token).await,
        };

        let resolved = match driven {
            Ok(stop_reason) => {
                state.stop_reason = Some(stop_reason);
                resolve_output(&state.definition, &state).map(|output| (stop_reason, output))
            }
            Err(e) => Err(e),
        };

        match resolved {
            Ok((stop_reason, output)) => {
                info!(
                    agent_id = %definition.id,
                    run_id = %run_id,
                    steps = state.steps,
                    %stop_reason,
                    "run completed"
                );
                self.emit(RunEvent::RunCompleted {
                    run_id: run_id.clone(),
                    agent_id: definition.id.clone(),
                    stop_reason,
                    steps: state.steps,
                })
                .await;
                Ok(RunOutcome {
                    run_id,
                    agent_id: definition.id.clone(),
                    output,
                    stop_reason,
                    steps: state.steps,
                    usage: state.usage,
                    messages: state.history.into_messages(),
                })
            }
            Err(e) => {
                info!(
                    agent_id = %definition.id,
                    run_id = %run_id,
                    steps = state.steps,
                    error = %e,
                    "run failed"
                );
                self.emit(RunEvent::RunFailed {
                    run_id,
                    agent_id: definition.id.clone(),
                    error: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    /// The default loop: keep taking model turns until the model stops
    /// requesting tools or the budget runs out.
    async fn drive_default_loop(
        &self,
        state: &mut AgentRunState,
        depth: u32,
        cancel_token: &CancellationToken,
    ) -> Result<StopReason> {
        let budget = state.step_budget(self.config.max_steps);
        let report = self
            .run_until_model_stops(state, budget, depth, cancel_token)
            .await?;
        Ok(if report.budget_exhausted {
            StopReason::StepBudgetExhausted
        } else {
            StopReason::ModelStop
        })
    }

    /// Drive a step program to completion.
    async fn drive_program(
        &self,
        mut program: Box<dyn StepProgram>,
        state: &mut AgentRunState,
        depth: u32,
        cancel_token: &CancellationToken,
    ) -> Result<StopReason> {
        let budget = state.step_budget(self.config.max_steps);
        let mut outcome = StepOutcome::Started;

        loop {
            if cancel_token.is_cancelled() {
                return run_error::CancelledSnafu.fail();
            }
            match program.resume(outcome) {
                ProgramStep::Finished => return Ok(StopReason::ProgramComplete),
                ProgramStep::Signal(signal) => {
                    match self
                        .execute_signal(signal, state, budget, depth, cancel_token)
                        .await?
                    {
                        SignalFlow::Continue(next) => outcome = next,
                        SignalFlow::Terminal(stop_reason) => return Ok(stop_reason),
                    }
                }
            }
        }
    }

    /// Execute one program signal.
    ///
    /// `Step` and `StepAll` arriving with the budget already exhausted
    /// terminate the run without a model call; `StepText` and `CallTool`
    /// still execute, since the budget bounds model calls only.
    async fn execute_signal(
        &self,
        signal: StepSignal,
        state: &mut AgentRunState,
        budget: u32,
        depth: u32,
        cancel_token: &CancellationToken,
    ) -> Result<SignalFlow> {
        match signal {
            StepSignal::Step => {
                if state.steps >= budget {
                    return Ok(SignalFlow::Terminal(StopReason::StepBudgetExhausted));
                }
                let report = self.run_one_turn(state, depth, cancel_token).await?;
                Ok(SignalFlow::Continue(StepOutcome::Stepped(report)))
            }
            StepSignal::StepAll => {
                if state.steps >= budget {
                    return Ok(SignalFlow::Terminal(StopReason::StepBudgetExhausted));
                }
                let report = self
                    .run_until_model_stops(state, budget, depth, cancel_token)
                    .await?;
                Ok(SignalFlow::Continue(StepOutcome::Stepped(report)))
            }
            StepSignal::StepText(text) => {
                let run_id = state.run_id.to_string();
                state.history.push(Message::assistant(text.clone()));
                // Step 0 marks text injected outside a model turn
                self.emit(RunEvent::AssistantMessage {
                    run_id,
                    step: 0,
                    text,
                })
                .await;
                Ok(SignalFlow::Continue(StepOutcome::TextEmitted))
            }
            StepSignal::CallTool { name, input } => {
                let call = ToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                    name: name.clone(),
                    arguments: input,
                };
                let mut results = self
                    .dispatch_and_apply(state, vec![call], depth, cancel_token)
                    .await?;
                match results.pop() {
                    Some(result) => Ok(SignalFlow::Continue(StepOutcome::ToolCalled(result))),
                    // One call in, one result out is the dispatcher contract
                    None => Err(run_error::ToolSnafu { name }.into_error(
                        ensemble_tools::ToolError::Internal {
                            message: "dispatcher returned no result".to_string(),
                            location: snafu::Location::default(),
                        },
                    )),
                }
            }
        }
    }

    /// Run exactly one model turn, dispatching any tools it requests.
    async fn run_one_turn(
        &self,
        state: &mut AgentRunState,
        depth: u32,
        cancel_token: &CancellationToken,
    ) -> Result<StepReport> {
        let response = self.execute_model_turn(state, cancel_token).await?;
        let tool_calls = response.tool_calls();
        let requested = tool_calls.len();

        if !tool_calls.is_empty() {
            self.dispatch_and_apply(state, tool_calls, depth, cancel_token)
                .await?;
        }

        let text = response.text();
        Ok(StepReport {
            steps_taken: 1,
            requested_tool_calls: requested,
            last_assistant_text: (!text.is_empty()).then_some(text),
            budget_exhausted: false,
        })
    }

    /// Repeat model turns until the model stops requesting tools or the
    /// budget runs out.
    ///
    /// The budget is re-checked after each model call and before its tool
    /// dispatch, so a run never spends budget it does not have.
    async fn run_until_model_stops(
        &self,
        state: &mut AgentRunState,
        budget: u32,
        depth: u32,
        cancel_token: &CancellationToken,
    ) -> Result<StepReport> {
        let mut report = StepReport::default();

        loop {
            if state.steps >= budget {
                report.budget_exhausted = true;
                return Ok(report);
            }

            let response = self.execute_model_turn(state, cancel_token).await?;
            report.steps_taken += 1;
            let text = response.text();
            if !text.is_empty() {
                report.last_assistant_text = Some(text);
            }

            let tool_calls = response.tool_calls();
            if tool_calls.is_empty() {
                return Ok(report);
            }
            report.requested_tool_calls += tool_calls.len();

            if state.steps >= budget {
                // Budget spent on this call; the requested tools never run
                report.budget_exhausted = true;
                return Ok(report);
            }
            self.dispatch_and_apply(state, tool_calls, depth, cancel_token)
                .await?;
        }
    }

    /// One model call: emit step events, invoke the provider through the
    /// retry layer, record usage, and append the assistant message.
    async fn execute_model_turn(
        &self,
        state: &mut AgentRunState,
        cancel_token: &CancellationToken,
    ) -> Result<CompletionResponse> {
        state.steps += 1;
        let step = state.steps;
        let run_id = state.run_id.to_string();

        debug!(run_id = %run_id, step, "step started");
        self.emit(RunEvent::StepStarted {
            run_id: run_id.clone(),
            step,
        })
        .await;

        let request = self.build_request(state);
        let response = self.call_model(&run_id, request, cancel_token).await?;

        state.usage.add(&response.usage);
        let tool_call_count = response.content.iter().filter(|p| p.is_tool_use()).count();
        self.emit(RunEvent::ModelCallCompleted {
            run_id: run_id.clone(),
            step,
            tool_call_count,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
        .await;

        let text = response.text();
        if !text.is_empty() {
            self.emit(RunEvent::AssistantMessage { run_id, step, text }).await;
        }

        state.history.push(response.assistant_message());
        Ok(response)
    }

    /// Build the completion request for the current state.
    fn build_request(&self, state: &AgentRunState) -> CompletionRequest {
        let mut request = CompletionRequest::new(state.definition.model.clone())
            .with_messages(state.history.for_completion())
            .with_tools(self.tools.definitions_for(&state.definition.tools));
        if let Some(prompt) = &state.system_prompt {
            request = request.with_system_prompt(prompt.clone());
        }
        request
    }

    /// Invoke the model through the retry layer, observing cancellation.
    async fn call_model(
        &self,
        run_id: &str,
        request: CompletionRequest,
        cancel_token: &CancellationToken,
    ) -> Result<CompletionResponse> {
        let executor = RetryExecutor::new(self.config.retry.clone()).with_observer(Arc::new(
            RetryEventObserver {
                run_id: run_id.to_string(),
                event_tx: self.event_tx.clone(),
            },
        ));

        let model = self.model.clone();
        let call = executor.execute(move || {
            let model = model.clone();
            let request = request.clone();
            async move { model.complete(request).await }
        });

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => run_error::CancelledSnafu.fail(),
            result = call => result.context(run_error::ProviderSnafu),
        }
    }

    /// Dispatch one step's tool calls and fold the results into the run.
    ///
    /// Returns the per-call results after application, in input order.
    async fn dispatch_and_apply(
        &self,
        state: &mut AgentRunState,
        calls: Vec<ToolCall>,
        depth: u32,
        cancel_token: &CancellationToken,
    ) -> Result<Vec<ToolCallResult>> {
        let dispatcher = self.make_dispatcher(state, depth, cancel_token);
        let results = dispatcher
            .dispatch(calls)
            .await
            .map_err(|e| run_error_from_tool("dispatch", e))?;
        self.apply_step_results(state, results).await
    }

    /// Apply tool results to the run state.
    ///
    /// Modifiers take effect in call order; successful and in-band-failed
    /// results become parts of one tool message appended after the batch.
    /// The append is skipped when a `ReplaceMessages` modifier already
    /// rewrote history this step: the replacement wins. Capability
    /// violations and cancellation abort the run instead.
    async fn apply_step_results(
        &self,
        state: &mut AgentRunState,
        results: Vec<ToolCallResult>,
    ) -> Result<Vec<ToolCallResult>> {
        let run_id = state.run_id.to_string();
        let mut parts: Vec<ContentPart> = Vec::with_capacity(results.len());
        let mut applied: Vec<ToolCallResult> = Vec::with_capacity(results.len());
        let mut replaced = false;

        for result in results {
            let ToolCallResult {
                call_id,
                name,
                result,
            } = result;
            match result {
                Ok(output) => {
                    for modifier in &output.modifiers {
                        match modifier {
                            RunModifier::SetOutput { value } => {
                                state.structured_output = Some(value.clone());
                                self.emit(RunEvent::OutputSet {
                                    run_id: run_id.clone(),
                                })
                                .await;
                            }
                            RunModifier::ReplaceMessages { messages } => {
                                state.history.replace_all(messages.clone());
                                replaced = true;
                                self.emit(RunEvent::MessagesReplaced {
                                    run_id: run_id.clone(),
                                    message_count: messages.len(),
                                })
                                .await;
                            }
                        }
                    }
                    parts.push(ContentPart::ToolResult {
                        tool_use_id: call_id.clone(),
                        content: output.content.clone(),
                        is_error: output.is_error,
                    });
                    applied.push(ToolCallResult {
                        call_id,
                        name,
                        result: Ok(output),
                    });
                }
                Err(error) => {
                    if error.is_capability_violation() || error.is_cancelled() {
                        return Err(run_error_from_tool(&name, error));
                    }
                    debug!(call_id = %call_id, name = %name, error = %error, "tool failed in-band");
                    parts.push(ContentPart::tool_error(
                        call_id.clone(),
                        error.to_output_message(),
                    ));
                    applied.push(ToolCallResult {
                        call_id,
                        name,
                        result: Err(error),
                    });
                }
            }
        }

        if !replaced && !parts.is_empty() {
            state.history.push(Message::new(Role::Tool, parts));
        }
        Ok(applied)
    }

    /// Build the dispatcher for one step, wiring in a spawner that
    /// carries the parent's state snapshot.
    fn make_dispatcher(
        &self,
        state: &AgentRunState,
        depth: u32,
        cancel_token: &CancellationToken,
    ) -> ToolDispatcher {
        let definition = &state.definition;
        let spawner = RunSpawner::new(
            self.clone(),
            spawn_snapshot(&state.history),
            state.system_prompt.clone(),
            state.run_id.to_string(),
            depth,
            cancel_token.clone(),
        );

        let mut dispatcher = ToolDispatcher::new(
            self.tools.clone(),
            self.config.dispatcher_config(),
            state.run_id.clone(),
            definition.id.clone(),
        )
        .with_declared_tools(definition.tools.iter().cloned())
        .with_spawnable_agents(definition.spawnable_agents.clone())
        .with_spawner(Arc::new(spawner))
        .with_cancel_token(cancel_token.clone());

        if let Some(tx) = &self.event_tx {
            dispatcher = dispatcher.with_event_tx(tx.clone());
        }
        if let Some(schema) = &definition.output_schema {
            dispatcher = dispatcher.with_output_schema(schema.clone());
        }
        dispatcher
    }

    /// Emit a run event.
    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.send(event).await {
                debug!("Failed to send run event: {e}");
            }
        }
    }
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("config", &self.config)
            .field("programs", &self.programs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Control flow after executing one program signal.
enum SignalFlow {
    /// Resume the program with this outcome.
    Continue(StepOutcome),
    /// The run is terminal; do not resume the program.
    Terminal(StopReason),
}

/// Forwards retry notifications onto the run event channel.
struct RetryEventObserver {
    run_id: String,
    event_tx: Option<mpsc::Sender<RunEvent>>,
}

impl RetryObserver for RetryEventObserver {
    fn on_retry(&self, attempt: u32, delay: Duration, error: &ProviderError) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.try_send(RunEvent::ModelCallRetrying {
                run_id: self.run_id.clone(),
                attempt,
                delay_ms: delay.as_millis() as u64,
                error: error.to_string(),
            });
        }
    }
}

/// Compose the opening user message from the prompt, the definition's
/// instructions, and the bound params.
fn compose_initial_message(input: &RunInput, definition: &AgentDefinition) -> Option<String> {
    let mut sections: Vec<String> = Vec::new();
    if let Some(prompt) = &input.prompt {
        if !prompt.is_empty() {
            sections.push(prompt.clone());
        }
    }
    if let Some(instructions) = &definition.instructions_prompt {
        if !instructions.is_empty() {
            sections.push(instructions.clone());
        }
    }
    if let Some(params) = &input.params {
        sections.push(format!("Input parameters:\n```json\n{params:#}\n```"));
    }
    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// History snapshot handed to spawned children: the conversation as the
/// model saw it when it requested the spawn, without the still-pending
/// tool-use message.
fn spawn_snapshot(history: &MessageHistory) -> Vec<Message> {
    let messages = history.messages();
    match messages.last() {
        Some(last) if last.role == Role::Assistant && last.has_tool_use() => {
            messages[..messages.len() - 1].to_vec()
        }
        _ => messages.to_vec(),
    }
}

#[cfg(test)]
#[path = "runner.test.rs"]
mod tests;
