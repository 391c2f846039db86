//! The model trait implemented by provider backends.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::request::CompletionRequest;
use crate::response::CompletionResponse;

/// A model provider capable of serving completion requests.
///
/// The run loop holds a single `Arc<dyn Model>` and passes the target
/// model identifier inside each [`CompletionRequest`], so one
/// implementation can route to any number of backend models.
///
/// Implementations surface failures as [`ProviderError`]; the caller
/// decides retry behavior from
/// [`is_retryable`](ProviderError::is_retryable).
#[async_trait]
pub trait Model: Send + Sync {
    /// Provider name, used in logs and events.
    fn name(&self) -> &str;

    /// Issue one completion call.
    ///
    /// This is a single attempt. Retries for transient failures are
    /// handled by the caller via [`RetryExecutor`](crate::RetryExecutor).
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ensemble_protocol::ContentPart;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::response::FinishReason;

    struct EchoModel;

    #[async_trait]
    impl Model for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            let last = request
                .messages
                .last()
                .map(|m| m.text())
                .unwrap_or_default();
            Ok(CompletionResponse::new(request.model)
                .with_content(vec![ContentPart::text(last)])
                .with_finish_reason(FinishReason::Stop))
        }
    }

    #[tokio::test]
    async fn test_model_trait_object() {
        let model: Arc<dyn Model> = Arc::new(EchoModel);
        assert_eq!(model.name(), "echo");

        let request = CompletionRequest::new("test-model")
            .add_message(ensemble_protocol::Message::user("hello"));
        let response = model.complete(request).await.unwrap();
        assert_eq!(response.text(), "hello");
        assert_eq!(response.model, "test-model");
    }
}
