use std::fmt;
use std::time::Duration;

use crate::error::{LlmError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_SEED: u64 = 1234;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the hosted chat-completion API
#[derive(Clone)]
pub struct VendorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub seed: u64,
    pub request_timeout: Duration,
}

impl VendorConfig {
    /// Reads `GROQ_API_KEY`, `VENDOR_BASE_URL`, `VISION_MODEL`, `VENDOR_SEED` and
    /// `VENDOR_TIMEOUT_SECS` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::Config("GROQ_API_KEY environment variable not set".into()))?;

        let base_url = lookup("VENDOR_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = lookup("VISION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let seed = match lookup("VENDOR_SEED") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| LlmError::Config(format!("invalid VENDOR_SEED '{}': {}", raw, e)))?,
            None => DEFAULT_SEED,
        };

        let timeout_secs = match lookup("VENDOR_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                LlmError::Config(format!("invalid VENDOR_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            base_url,
            model,
            seed,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl fmt::Debug for VendorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("seed", &self.seed)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = VendorConfig::from_lookup(lookup_from(&[("GROQ_API_KEY", "gsk_test")])).unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(
            config.completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = VendorConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));

        let err = VendorConfig::from_lookup(lookup_from(&[("GROQ_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = VendorConfig::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "k"),
            ("VENDOR_BASE_URL", "http://localhost:9000/v1/"),
            ("VISION_MODEL", "local-model"),
            ("VENDOR_SEED", "42"),
            ("VENDOR_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.completions_url(), "http://localhost:9000/v1/chat/completions");
        assert_eq!(config.model, "local-model");
        assert_eq!(config.seed, 42);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_seed_is_rejected() {
        let err = VendorConfig::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "k"),
            ("VENDOR_SEED", "abc"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("VENDOR_SEED"));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = VendorConfig::from_lookup(lookup_from(&[("GROQ_API_KEY", "gsk_secret")])).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("gsk_secret"));
    }
}
