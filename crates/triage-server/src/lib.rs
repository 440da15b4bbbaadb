//! HTTP wrapper around the Triage pipeline.
//!
//! Routes:
//! - `POST /prioritize` (also `/api/prioritize`): run the pipeline, `X-API-Key` required
//! - `GET /api/info`: service description, `X-API-Key` required
//! - `GET /health`: liveness, unauthenticated

pub mod config;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use triage_pipeline::PipelineExecutor;
use triage_types::TaskRecord;

pub use config::{ServerConfig, DEV_API_KEY};

pub const API_KEY_HEADER: &str = "x-api-key";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared by every request. Each request still gets its own pipeline state.
#[derive(Clone)]
pub struct AppState {
    executor: Arc<PipelineExecutor>,
    api_key: Arc<str>,
}

impl AppState {
    pub fn new(executor: Arc<PipelineExecutor>, api_key: impl Into<String>) -> Self {
        Self {
            executor,
            api_key: Arc::from(api_key.into()),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            Some(key) if key == &*self.api_key => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizeRequest {
    #[serde(default)]
    pub user_input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritizeResponse {
    pub output: String,
    pub prioritized_tasks: Vec<TaskRecord>,
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    /// The executor itself faulted.
    Pipeline(triage_types::TriageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid API Key" })),
            )
                .into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Pipeline(e) => {
                let status = StatusCode::from_u16(e.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (
                    status,
                    Json(json!({
                        "error": e.to_string(),
                        "output": "Error occurred while prioritizing tasks.",
                        "prioritized_tasks": [],
                    })),
                )
                    .into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/prioritize", post(prioritize))
        .route("/api/prioritize", post(prioritize))
        .route("/api/info", get(info))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.authorize(&headers)?;
    Ok(Json(json!({
        "name": "Task Prioritizer API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "API for prioritizing tasks using LLMs",
        "endpoints": [
            {
                "path": "/prioritize",
                "method": "POST",
                "description": "Prioritize tasks using LLMs"
            },
            {
                "path": "/health",
                "method": "GET",
                "description": "Liveness check"
            }
        ]
    })))
}

async fn prioritize(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PrioritizeRequest>, JsonRejection>,
) -> Result<Json<PrioritizeResponse>, ApiError> {
    state.authorize(&headers)?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let run = state
        .executor
        .run(request.user_input)
        .await
        .map_err(ApiError::Pipeline)?;

    tracing::info!(
        run_id = %run.run_id,
        succeeded = run.succeeded(),
        duration_ms = run.duration_ms,
        "Prioritize request served"
    );

    let final_state = run.final_state;
    Ok(Json(PrioritizeResponse {
        output: final_state.output().to_string(),
        prioritized_tasks: final_state.prioritized_tasks().to_vec(),
        errors: final_state.errors().to_vec(),
    }))
}
