use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use triage_types::TriageError;

use crate::{Message, Request, Response};

// ---------------------------------------------------------------------------
// ProviderAdapter — one vendor's HTTP API
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn complete(&self, request: &Request) -> Result<Response, TriageError>;
    fn name(&self) -> &str;
    fn default_model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// DynProvider
// ---------------------------------------------------------------------------

pub struct DynProvider(Box<dyn ProviderAdapter>);

impl DynProvider {
    pub fn new(provider: impl ProviderAdapter + 'static) -> Self {
        Self(Box::new(provider))
    }

    pub async fn complete(&self, request: &Request) -> Result<Response, TriageError> {
        self.0.complete(request).await
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn default_model(&self) -> &str {
        self.0.default_model()
    }
}

// ---------------------------------------------------------------------------
// ChatModel — the capability pipeline nodes depend on
// ---------------------------------------------------------------------------

/// Turns an ordered message list into generated text.
///
/// Implementations must report every failure as an `Err`; an empty reply is
/// never a success.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Result<String, TriageError>;
}

// ---------------------------------------------------------------------------
// ScriptedModel — deterministic stand-in for tests and offline runs
// ---------------------------------------------------------------------------

/// Replays a fixed queue of replies, one per `generate` call, and records the
/// messages it was sent.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, TriageError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    /// Queue a failure.
    pub fn fail(self, error: TriageError) -> Self {
        self.push(Err(error))
    }

    fn push(self, item: Result<String, TriageError>) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
        self
    }

    /// Messages received so far, one entry per call.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, messages: &[Message]) -> Result<String, TriageError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(TriageError::ProviderError {
                    provider: "scripted".into(),
                    status: 0,
                    message: "no scripted reply left".into(),
                    retryable: false,
                })
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
