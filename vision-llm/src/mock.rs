use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{ChatCompletion, ChatRequest};
use crate::error::{LlmError, Result};

/// A `ChatCompletion` that plays back canned answers in order and records every request.
///
/// When the script runs out, further calls fail.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LlmError::VendorStatus {
                status: 500,
                body: message,
            }),
            None => Err(LlmError::VendorStatus {
                status: 503,
                body: "no scripted response left".to_string(),
            }),
        }
    }
}
