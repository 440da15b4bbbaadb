//! Model-invocation client for the Triage pipeline.
//!
//! Provides the `ChatModel` capability consumed by pipeline nodes, the
//! `ProviderAdapter` trait with OpenAI and Anthropic implementations, a
//! middleware chain, retry with backoff, and `LlmClient` tying them together.

mod anthropic;
mod client;
mod config;
mod openai;
mod provider;
mod retry;
mod types;

pub use anthropic::AnthropicAdapter;
pub use client::*;
pub use config::LlmConfig;
pub use openai::OpenAiAdapter;
pub use provider::*;
pub use retry::{complete_with_retry, BackoffPolicy};
pub use types::*;
