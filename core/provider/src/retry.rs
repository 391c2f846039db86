//! Retry configuration and execution.
//!
//! Provides exponential backoff with randomized jitter for transient
//! provider failures. Fatal errors (see
//! [`ProviderError::is_retryable`]) are surfaced immediately without
//! retrying.
//!
//! # Example
//!
//! ```ignore
//! use ensemble_provider::{RetryConfig, RetryExecutor};
//!
//! let config = RetryConfig::default()
//!     .with_max_attempts(5)
//!     .with_base_delay_ms(200);
//!
//! let executor = RetryExecutor::new(config);
//! let result = executor.execute(|| async {
//!     make_model_call().await
//! }).await;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::error::ProviderError;

/// Retry configuration with exponential backoff.
///
/// All fields have defaults, so a config deserialized from `{}` is
/// fully usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff multiplier applied per retry.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Jitter ratio (0.0-1.0). Each delay lands uniformly within this
    /// fraction of the backoff base, in both directions.
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
    /// Honor the provider's suggested retry delay when present.
    #[serde(default = "default_respect_retry_after")]
    pub respect_retry_after: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter_ratio() -> f64 {
    0.2
}

fn default_respect_retry_after() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_ratio: default_jitter_ratio(),
            respect_retry_after: default_respect_retry_after(),
        }
    }
}

impl RetryConfig {
    /// Create a config that disables retries (single attempt).
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry, in milliseconds.
    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    /// Set the upper bound on any single delay, in milliseconds.
    pub fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the jitter ratio (0.0 to 1.0).
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Set whether to respect retry-after from errors.
    pub fn with_respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Backoff base for the given attempt (1-based), before jitter,
    /// capped at the maximum delay.
    pub fn backoff_base(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let ms = (self.base_delay_ms as f64) * self.multiplier.powi(exponent);
        Duration::from_millis(ms.min(self.max_delay_ms as f64) as u64)
    }
}

/// Observer hooks for retry activity.
///
/// The run loop uses this to surface retries as run events; tests use
/// it to record the computed delays. All methods default to no-ops.
pub trait RetryObserver: Send + Sync {
    /// Called before sleeping between attempts.
    fn on_retry(&self, _attempt: u32, _delay: Duration, _error: &ProviderError) {}

    /// Called when no further attempts will be made.
    fn on_exhausted(&self, _attempts: u32, _error: &ProviderError) {}
}

/// Retry executor with observer integration.
pub struct RetryExecutor {
    config: RetryConfig,
    observer: Option<Arc<dyn RetryObserver>>,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Add an observer to the executor.
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Execute an operation with retries.
    ///
    /// The operation is retried according to the configuration when it
    /// returns a retryable error (as determined by
    /// [`ProviderError::is_retryable`]).
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.config.max_attempts {
                        if let Some(ref observer) = self.observer {
                            observer.on_exhausted(attempt, &error);
                        }
                        return Err(error);
                    }

                    let delay = self.calculate_delay(attempt, &error);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "provider call failed, retrying"
                    );
                    if let Some(ref observer) = self.observer {
                        observer.on_retry(attempt, delay, &error);
                    }

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn calculate_delay(&self, attempt: u32, error: &ProviderError) -> Duration {
        // Honor retry-after if available
        if self.config.respect_retry_after {
            if let Some(delay) = error.retry_delay() {
                return delay.min(Duration::from_millis(self.config.max_delay_ms));
            }
        }

        // Exponential backoff with uniform jitter within +/- jitter_ratio
        let base = self.config.backoff_base(attempt).as_secs_f64();
        let spread = self.config.jitter_ratio * rand::rng().random_range(-1.0..=1.0);
        Duration::from_secs_f64((base * (1.0 + spread)).max(0.0))
    }
}

#[cfg(test)]
#[path = "retry.test.rs"]
mod tests;
