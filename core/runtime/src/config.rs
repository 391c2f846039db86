//! Run configuration.

use ensemble_provider::RetryConfig;
use ensemble_tools::DispatcherConfig;
use serde::Deserialize;
use serde::Serialize;

/// Configuration for agent runs.
///
/// All fields have defaults, so a config deserialized from `{}` is fully
/// usable. Per-agent `max_steps` overrides in the definition take
/// precedence over the value here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Step budget: maximum model calls per run.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Retry policy for transient provider failures.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Timeout for a single tool execution, in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: i64,
    /// Maximum concurrent tool executions within one step.
    #[serde(default = "default_max_tool_concurrency")]
    pub max_tool_concurrency: i32,
    /// Cap on a single tool output, in characters.
    #[serde(default = "default_max_tool_output_chars")]
    pub max_tool_output_chars: usize,
}

fn default_max_steps() -> u32 {
    100
}

fn default_tool_timeout_secs() -> i64 {
    120
}

fn default_max_tool_concurrency() -> i32 {
    ensemble_tools::dispatcher::DEFAULT_MAX_TOOL_CONCURRENCY
}

fn default_max_tool_output_chars() -> usize {
    100_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            retry: RetryConfig::default(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_tool_concurrency: default_max_tool_concurrency(),
            max_tool_output_chars: default_max_tool_output_chars(),
        }
    }
}

impl RunConfig {
    /// Set the step budget.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-tool timeout in seconds.
    pub fn with_tool_timeout_secs(mut self, secs: i64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }

    /// The dispatcher configuration derived from this run configuration.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrency: self.max_tool_concurrency,
            default_timeout_secs: self.tool_timeout_secs,
            max_output_chars: self.max_tool_output_chars,
        }
    }
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
