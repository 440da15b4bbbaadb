//! Shared types and errors for the Triage task prioritizer.
//!
//! This crate provides the foundational types used across all other Triage crates:
//! - `TriageError` — unified error taxonomy
//! - `TaskRecord` / `Importance` — one structured task
//! - `PipelineState` / `Step` — the value threaded through the pipeline graph

mod state;
mod task;

pub use state::{PipelineState, Step};
pub use task::{Importance, TaskRecord};

/// Unified error type for all Triage subsystems.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    // === Model invocation errors ===
    #[error("Provider {provider} returned HTTP {status}: {message}")]
    ProviderError {
        provider: String,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthError { provider: String },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    RequestTimeout { provider: String, timeout_ms: u64 },

    // === Pipeline data errors ===
    #[error("{0}")]
    Input(String),

    #[error("JSON parsing failed: {message}\nRaw content: {snippet}...")]
    Extraction { snippet: String, message: String },

    #[error("Expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    // === Executor faults ===
    #[error("Internal pipeline error: {0}")]
    Internal(String),

    // === Generic ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TriageError {
    /// Returns `true` if the error is transient and the call may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TriageError::RateLimited { .. }
                | TriageError::RequestTimeout { .. }
                | TriageError::ProviderError {
                    retryable: true,
                    ..
                }
        )
    }

    /// Returns `true` for failures of the model-invocation collaborator itself.
    pub fn is_invocation(&self) -> bool {
        matches!(
            self,
            TriageError::ProviderError { .. }
                | TriageError::RateLimited { .. }
                | TriageError::AuthError { .. }
                | TriageError::RequestTimeout { .. }
        )
    }

    /// Returns `true` if the error signals a defect in the executor rather
    /// than a bad input or an unreliable model.
    pub fn is_internal(&self) -> bool {
        matches!(self, TriageError::Internal(_))
    }

    /// Maps the error to an HTTP status code for server mode.
    pub fn http_status(&self) -> u16 {
        match self {
            TriageError::RateLimited { .. } => 429,
            TriageError::AuthError { .. } => 502,
            TriageError::ProviderError { .. } => 502,
            TriageError::RequestTimeout { .. } => 504,
            TriageError::Input(_) => 400,
            TriageError::Extraction { .. } | TriageError::Shape { .. } => 422,
            _ => 500,
        }
    }
}

/// A convenience alias for `Result<T, TriageError>`.
pub type Result<T> = std::result::Result<T, TriageError>;
