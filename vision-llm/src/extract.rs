use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{LlmError, Result};

/// Pull the JSON object out of free-form model text.
///
/// Takes everything from the first `{` to the last `}` and parses it. Every failure is a
/// `ResponseParse` error carrying the raw text.
pub fn extract_json_object(raw: &str) -> Result<Value> {
    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(LlmError::ResponseParse {
                reason: "no JSON object delimiters in response".to_string(),
                raw_text: raw.to_string(),
            });
        }
    };

    serde_json::from_str::<Value>(&raw[start..=end]).map_err(|e| LlmError::ResponseParse {
        reason: e.to_string(),
        raw_text: raw.to_string(),
    })
}

/// Like [`extract_json_object`], then decode into `T`. A record that does not match `T` is
/// reported as a parse failure too.
pub fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value = extract_json_object(raw)?;
    serde_json::from_value::<T>(value).map_err(|e| LlmError::ResponseParse {
        reason: format!("response does not match expected record: {}", e),
        raw_text: raw.to_string(),
    })
}
