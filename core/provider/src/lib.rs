//! Model provider abstraction.
//!
//! Defines the [`Model`] trait that the run loop calls for completions,
//! the request/response types exchanged across that boundary, and the
//! retry machinery that wraps transient provider failures in exponential
//! backoff with jitter.

pub mod error;
pub mod model;
pub mod request;
pub mod response;
pub mod retry;

pub use error::ProviderError;
pub use model::Model;
pub use request::CompletionRequest;
pub use response::CompletionResponse;
pub use response::FinishReason;
pub use retry::RetryConfig;
pub use retry::RetryExecutor;
pub use retry::RetryObserver;
