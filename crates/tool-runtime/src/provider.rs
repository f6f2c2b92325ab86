use crate::model::{ModelRequest, ModelResponse};
use async_trait::async_trait;

/// Trait for chat models that can be offered tools.
///
/// This trait lives in tool-runtime because it's defined by the consumer
/// (the agentic loop), not the provider. Implementations translate to and
/// from their wire format and report what the model produced verbatim;
/// normalizing it is the bridge's job.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Ask the model for the next turn.
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Provider name for logging/debugging (e.g., "ollama", "mock")
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Mock provider for testing the agentic loop without a real model.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use crate::model::FinishSignal;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns pre-configured responses in the order they were queued and
    /// records every request it receives.
    #[derive(Default)]
    pub struct MockModelProvider {
        responses: Mutex<VecDeque<ModelResponse>>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl MockModelProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue_response(&self, response: ModelResponse) {
            self.responses.lock().unwrap().push_back(response);
        }

        /// Queue a plain text answer.
        pub fn queue_text(&self, text: &str) {
            self.queue_response(ModelResponse::text(text));
        }

        pub fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelProvider for MockModelProvider {
        async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.requests.lock().unwrap().push(request);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ModelResponse::new(Vec::new(), FinishSignal::Stop)))
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }
}
