//! VendorCaller – issues one chat-completion call with the fixed sampling parameters and applies the
//! single fallback: a failed strict-JSON call is retried exactly once in free-text mode.
//!
//! Nothing else is retried. There is no backoff and no circuit breaking; the only time limit is the
//! timeout configured on the underlying HTTP client.

use std::sync::Arc;

use tracing::warn;

use crate::client::{ChatCompletion, ChatMessage, ChatRequest, GroqClient, ResponseMode};
use crate::config::VendorConfig;
use crate::error::{LlmError, Result};

#[derive(Clone)]
pub struct VendorCaller {
    client: Arc<dyn ChatCompletion>,
    model: String,
    seed: u64,
}

impl VendorCaller {
    pub fn new(client: Arc<dyn ChatCompletion>, model: impl Into<String>, seed: u64) -> Self {
        Self {
            client,
            model: model.into(),
            seed,
        }
    }

    /// Caller backed by the live vendor endpoint described by `config`.
    pub fn from_config(config: &VendorConfig) -> Result<Self> {
        let client = GroqClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.model.clone(), config.seed))
    }

    /// Send `messages` and return the model's raw text.
    pub async fn call(
        &self,
        messages: Vec<ChatMessage>,
        mode: ResponseMode,
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatRequest::new(self.model.clone(), messages, self.seed, max_tokens).with_mode(mode);

        match self.client.complete(&request).await {
            Ok(text) => Ok(text),
            Err(first) if mode == ResponseMode::StrictJson => {
                warn!(
                    error = %first,
                    "Strict JSON call failed, retrying once without JSON mode"
                );
                let relaxed = request.with_mode(ResponseMode::FreeText);
                self.client
                    .complete(&relaxed)
                    .await
                    .map_err(|e| LlmError::VendorCall(Box::new(e)))
            }
            Err(e) => Err(LlmError::VendorCall(Box::new(e))),
        }
    }
}
