//! Model-client configuration sourced from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use triage_types::TriageError;

/// Settings for the model-invocation client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai" or "anthropic"
    pub provider: String,

    /// Model identifier; `None` uses the adapter's default.
    pub model: Option<String>,

    /// API base URL override.
    pub base_url: Option<String>,

    /// API key; `None` falls back to the provider's standard variable.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub temperature: Option<f32>,

    pub max_tokens: u32,

    pub timeout_ms: u64,

    /// Retries for transient failures (rate limits, 5xx, timeouts).
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: None,
            max_tokens: 4096,
            timeout_ms: 60_000,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Read `TRIAGE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, TriageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TriageError> {
        let mut cfg = Self::default();

        if let Some(provider) = lookup("TRIAGE_PROVIDER") {
            cfg.provider = provider.trim().to_ascii_lowercase();
        }
        cfg.model = lookup("TRIAGE_MODEL").filter(|s| !s.trim().is_empty());
        cfg.base_url = lookup("TRIAGE_BASE_URL").filter(|s| !s.trim().is_empty());

        if let Some(raw) = lookup("TRIAGE_TIMEOUT_MS") {
            cfg.timeout_ms = raw.trim().parse().map_err(|_| {
                TriageError::Config(format!("TRIAGE_TIMEOUT_MS must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup("TRIAGE_MAX_RETRIES") {
            cfg.max_retries = raw.trim().parse().map_err(|_| {
                TriageError::Config(format!("TRIAGE_MAX_RETRIES must be an integer, got '{raw}'"))
            })?;
        }

        let key_var = cfg.api_key_var()?;
        cfg.api_key = lookup(key_var).filter(|s| !s.trim().is_empty());

        Ok(cfg)
    }

    /// The environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> Result<&'static str, TriageError> {
        match self.provider.as_str() {
            "openai" => Ok("OPENAI_API_KEY"),
            "anthropic" => Ok("ANTHROPIC_API_KEY"),
            other => Err(TriageError::Config(format!(
                "Unknown LLM provider: '{other}'. Supported: openai, anthropic"
            ))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
