use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use triage_types::TriageError;

use crate::{
    complete_with_retry, AnthropicAdapter, BackoffPolicy, ChatModel, DynProvider, LlmConfig,
    Message, OpenAiAdapter, ProviderAdapter, Request, Response,
};

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub trait Middleware: Send + Sync {
    fn before(&self, _request: &mut Request) {}
    fn after(&self, _request: &Request, _response: &mut Response) {}
}

// ---------------------------------------------------------------------------
// Built-in middleware: LoggingMiddleware
// ---------------------------------------------------------------------------

pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before(&self, request: &mut Request) {
        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            "LLM request"
        );
    }

    fn after(&self, _request: &Request, response: &mut Response) {
        tracing::info!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            finish = ?response.finish_reason,
            "LLM response"
        );
    }
}

// ---------------------------------------------------------------------------
// Built-in middleware: UsageTrackingMiddleware
// ---------------------------------------------------------------------------

/// Accumulates token counts across calls. Clones share the same counters.
#[derive(Clone)]
pub struct UsageTrackingMiddleware {
    total_input: Arc<AtomicU64>,
    total_output: Arc<AtomicU64>,
}

impl UsageTrackingMiddleware {
    pub fn new() -> Self {
        Self {
            total_input: Arc::new(AtomicU64::new(0)),
            total_output: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input.load(Ordering::Relaxed)
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output.load(Ordering::Relaxed)
    }
}

impl Default for UsageTrackingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for UsageTrackingMiddleware {
    fn after(&self, _request: &Request, response: &mut Response) {
        self.total_input
            .fetch_add(response.usage.input_tokens, Ordering::Relaxed);
        self.total_output
            .fetch_add(response.usage.output_tokens, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// LlmClient
// ---------------------------------------------------------------------------

/// One configured provider plus model settings, middleware, and retry.
pub struct LlmClient {
    provider: DynProvider,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    max_retries: usize,
    backoff: BackoffPolicy,
    middleware: Vec<Box<dyn Middleware>>,
}

impl LlmClient {
    pub fn new(provider: impl ProviderAdapter + 'static) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider: DynProvider::new(provider),
            model,
            max_tokens: None,
            temperature: None,
            max_retries: 0,
            backoff: BackoffPolicy::default(),
            middleware: Vec::new(),
        }
    }

    /// Build a client from configuration, attaching request logging.
    pub fn from_config(config: &LlmConfig) -> Result<Self, TriageError> {
        let key_var = config.api_key_var()?;
        let api_key = config.api_key.clone().ok_or_else(|| {
            tracing::error!(provider = %config.provider, var = key_var, "API key not set");
            TriageError::AuthError {
                provider: config.provider.clone(),
            }
        })?;

        let mut client = match config.provider.as_str() {
            "anthropic" => {
                let mut adapter = AnthropicAdapter::new(api_key).with_timeout(config.timeout());
                if let Some(ref url) = config.base_url {
                    adapter = adapter.with_base_url(url.clone());
                }
                Self::new(adapter)
            }
            _ => {
                let mut adapter = OpenAiAdapter::new(api_key).with_timeout(config.timeout());
                if let Some(ref url) = config.base_url {
                    adapter = adapter.with_base_url(url.clone());
                }
                Self::new(adapter)
            }
        };

        if let Some(ref model) = config.model {
            client = client.with_model(model.clone());
        }
        client.max_tokens = Some(config.max_tokens);
        client.temperature = config.temperature;
        client.max_retries = config.max_retries;
        Ok(client.with_middleware(LoggingMiddleware))
    }

    /// Shorthand for `LlmConfig::from_env()` followed by `from_config`.
    pub fn from_env() -> Result<Self, TriageError> {
        Self::from_config(&LlmConfig::from_env()?)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_retries(mut self, max_retries: usize, backoff: BackoffPolicy) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    pub fn with_middleware(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(m));
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, messages: &[Message]) -> Result<Response, TriageError> {
        let mut req = Request {
            model: self.model.clone(),
            messages: messages.to_vec(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        for m in &self.middleware {
            m.before(&mut req);
        }

        let mut resp = complete_with_retry(
            || self.provider.complete(&req),
            self.max_retries,
            &self.backoff,
            self.provider.name(),
        )
        .await?;

        for m in &self.middleware {
            m.after(&req, &mut resp);
        }

        Ok(resp)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn generate(&self, messages: &[Message]) -> Result<String, TriageError> {
        let resp = self.complete(messages).await?;
        if resp.text.trim().is_empty() {
            return Err(TriageError::ProviderError {
                provider: self.provider.name().to_string(),
                status: 200,
                message: "Model returned an empty completion".into(),
                retryable: false,
            });
        }
        Ok(resp.text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
