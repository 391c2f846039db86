//! Step programs: scripted control flow over the step executor.
//!
//! Most agents use the default loop (model decides everything). An agent
//! can instead register a [`StepProgram`]: a state machine that yields
//! [`StepSignal`]s telling the executor what to do next and is resumed
//! with the outcome of each signal. The executor owns all actual
//! execution; programs only steer.

use std::sync::Arc;

use ensemble_tools::ToolCallResult;
use serde_json::Value;

/// One instruction yielded by a step program.
#[derive(Debug, Clone)]
pub enum StepSignal {
    /// Run one model turn, dispatching any tools it requests.
    Step,
    /// Keep running model turns until the model stops requesting tools
    /// or the step budget is exhausted.
    StepAll,
    /// Append a literal assistant text message without a model call.
    StepText(String),
    /// Invoke a named tool directly. The declared-tool check applies
    /// exactly as it does for model-requested calls.
    CallTool { name: String, input: Value },
}

/// What a step program returns when resumed.
#[derive(Debug)]
pub enum ProgramStep {
    /// Execute this signal, then resume the program with its outcome.
    Signal(StepSignal),
    /// The program is done; the run terminates.
    Finished,
}

/// Summary of the model turns executed for a `Step` or `StepAll` signal.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// Model calls made while processing the signal.
    pub steps_taken: u32,
    /// Tool calls requested by the model across those turns.
    pub requested_tool_calls: usize,
    /// Text of the last assistant message, if any.
    pub last_assistant_text: Option<String>,
    /// True when the signal stopped because the budget ran out.
    pub budget_exhausted: bool,
}

/// Outcome handed to [`StepProgram::resume`].
#[derive(Debug)]
pub enum StepOutcome {
    /// First resumption; nothing has executed yet.
    Started,
    /// A `Step` or `StepAll` signal completed.
    Stepped(StepReport),
    /// A `CallTool` signal completed.
    ToolCalled(ToolCallResult),
    /// A `StepText` signal completed.
    TextEmitted,
}

/// A scripted driver for one agent's runs.
///
/// The executor treats the program as a coroutine with two resumption
/// points: yielded a signal (awaiting its outcome), or finished. Programs
/// hold their own state between resumptions.
///
/// # Example
///
/// ```ignore
/// struct TwoPhase { phase: u8 }
///
/// impl StepProgram for TwoPhase {
///     fn resume(&mut self, _outcome: StepOutcome) -> ProgramStep {
///         self.phase += 1;
///         match self.phase {
///             1 => ProgramStep::Signal(StepSignal::StepText("Gathering...".into())),
///             2 => ProgramStep::Signal(StepSignal::StepAll),
///             _ => ProgramStep::Finished,
///         }
///     }
/// }
/// ```
pub trait StepProgram: Send {
    /// Advance the program with the outcome of the previous signal.
    ///
    /// The first call passes [`StepOutcome::Started`].
    fn resume(&mut self, outcome: StepOutcome) -> ProgramStep;
}

/// Factory producing a fresh program instance per run.
pub type StepProgramFactory = Arc<dyn Fn() -> Box<dyn StepProgram> + Send + Sync>;
