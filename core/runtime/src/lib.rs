//! The step executor that drives agent runs.
//!
//! [`AgentRunner`] resolves an agent from the registry, seeds its run
//! state, and steps it to a terminal state: either with the default
//! model-driven loop or under a registered [`StepProgram`] that decides
//! when to step, inject text, or call tools directly. Child runs started
//! by `spawn_agents` go through the same executor recursively.

pub mod config;
pub mod error;
pub mod outcome;
pub mod output;
pub mod program;
pub mod runner;
pub mod state;

mod spawner;

pub use config::RunConfig;
pub use error::Result;
pub use error::RunError;
pub use outcome::RunInput;
pub use outcome::RunOutcome;
pub use output::resolve_output;
pub use program::ProgramStep;
pub use program::StepOutcome;
pub use program::StepProgram;
pub use program::StepProgramFactory;
pub use program::StepReport;
pub use program::StepSignal;
pub use runner::AgentRunner;
pub use state::AgentRunState;
