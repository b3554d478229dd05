use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the vendor model or interpreting its answer
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request to vendor failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vendor returned {status}: {body}")]
    VendorStatus { status: u16, body: String },

    #[error("malformed vendor response: {0}")]
    MalformedEnvelope(String),

    /// Raised once the single fallback attempt has also failed
    #[error("vendor API call failed: {0}")]
    VendorCall(#[source] Box<LlmError>),

    #[error("could not parse JSON from model response: {reason}")]
    ResponseParse { reason: String, raw_text: String },

    #[error("unexpected response shape: {reason}")]
    UnexpectedShape { reason: String, raw_text: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Raw model text attached to parse and shape failures.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            LlmError::ResponseParse { raw_text, .. } | LlmError::UnexpectedShape { raw_text, .. } => {
                Some(raw_text)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
