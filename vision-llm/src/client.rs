use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::VendorConfig;
use crate::error::{LlmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One element of a multimodal message body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying an instruction followed by a single inline image.
    pub fn user_with_image(text: impl Into<String>, image_data_uri: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_uri.into(),
                    },
                },
            ]),
        }
    }

    pub fn image_count(&self) -> usize {
        match &self.content {
            MessageContent::Text(_) => 0,
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
                .count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Ask the vendor for a JSON-only body
    StrictJson,
    FreeText,
}

/// A fully specified chat-completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub seed: u64,
    pub max_tokens: u32,
    pub mode: ResponseMode,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, seed: u64, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.0,
            top_p: 1.0,
            seed,
            max_tokens,
            mode: ResponseMode::FreeText,
        }
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    /// OpenAI-compatible request body.
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": self.messages,
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_tokens": self.max_tokens,
            "stream": false,
            "seed": self.seed,
        });

        if self.mode == ResponseMode::StrictJson {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        payload
    }
}

/// Anything able to answer a chat-completion request with text
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// HTTP client for Groq's OpenAI-compatible chat-completion endpoint
pub struct GroqClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GroqClient {
    pub fn new(config: &VendorConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http,
            endpoint: config.completions_url(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatCompletion for GroqClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let images: usize = request.messages.iter().map(ChatMessage::image_count).sum();
        info!(
            model = %request.model,
            mode = ?request.mode,
            images,
            "Calling vendor chat completion"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request.to_payload())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::VendorStatus {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response.json().await?;
        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LlmError::MalformedEnvelope("missing choices[0].message.content".to_string())
            })?;

        debug!("Vendor returned {} characters", content.len());
        Ok(content.to_string())
    }
}
