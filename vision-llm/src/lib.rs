pub mod caller;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod extract;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod prompts;

// Re-export commonly used types
pub use caller::VendorCaller;
pub use client::{ChatCompletion, ChatMessage, ChatRequest, GroqClient, ResponseMode};
pub use config::VendorConfig;
pub use encoding::{EncodedImage, encode_image_bytes, encode_image_file};
pub use error::{LlmError, Result};
pub use extract::{extract_json_object, parse_json_object};
pub use prompts::{NOT_SPECIFIED, OFF_TOPIC_REFUSAL, PromptKind, PromptTemplate, template};
