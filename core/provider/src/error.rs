//! Error types for the provider boundary.
//!
//! Provider implementations convert their backend-specific failures into a
//! unified [`ProviderError`]. Variants like `Transport` and `Parse` store
//! stringified messages rather than wrapping source errors directly: each
//! backend has different error types, and storing strings allows uniform
//! handling without leaking those types into the public API. The `From`
//! implementations preserve context by including the source error's Display
//! output.
//!
//! The run loop only distinguishes two classes: transient errors (retried
//! with backoff, see [`is_retryable`](ProviderError::is_retryable)) and
//! fatal errors (fail the run immediately).

use std::time::Duration;

use thiserror::Error;

/// Result type alias using ProviderError.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur when calling a model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Rate limit exceeded, with an optional provider-suggested delay.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Error message from the provider.
        message: String,
        /// Suggested delay before retrying, if the provider sent one.
        retry_after: Option<Duration>,
    },

    /// Network or HTTP error.
    ///
    /// The string contains the source error's display output, preserving
    /// error chain info.
    #[error("transport error: {0}")]
    Transport(String),

    /// Request was malformed or rejected by validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed (invalid or missing credentials).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Context window exceeded.
    #[error("context window exceeded: {0}")]
    ContextWindowExceeded(String),

    /// Provider returned an error response.
    #[error("provider error: {code}: {message}")]
    Api {
        /// Error code from the provider.
        code: String,
        /// Error message from the provider.
        message: String,
    },

    /// Failed to parse a response from the provider.
    #[error("parse error: {0}")]
    Parse(String),

    /// Internal provider error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Check if this error is transient.
    ///
    /// Returns `true` for errors that may succeed on retry:
    /// - `RateLimited` (temporary rate limiting)
    /// - `Transport` (connection issues, timeouts)
    ///
    /// Everything else is fatal and fails the run without retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::Transport(_)
        )
    }

    /// Get the provider-suggested retry delay, if available.
    ///
    /// Only returns a value for `RateLimited` errors that carried a delay.
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

#[cfg(test)]
#[path = "error.test.rs"]
mod tests;
