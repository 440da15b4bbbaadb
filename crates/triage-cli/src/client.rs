//! Client for a running `triage-server`.

use anyhow::{bail, Context as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use triage_types::TaskRecord;

/// Body returned by `POST /prioritize`, success or failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteResult {
    pub output: String,
    pub prioritized_tasks: Vec<TaskRecord>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub async fn prioritize(&self, user_input: &str) -> anyhow::Result<RemoteResult> {
        let url = format!("{}/prioritize", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&json!({ "user_input": user_input }))
            .send()
            .await
            .with_context(|| format!("could not reach {url}"))?;

        let status = resp.status();
        let body: RemoteResult = resp
            .json()
            .await
            .with_context(|| format!("unexpected response from {url} (HTTP {status})"))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            bail!("server rejected the API key");
        }
        if !status.is_success() {
            bail!(
                "server returned HTTP {status}: {}",
                body.error.as_deref().unwrap_or("no error message")
            );
        }
        Ok(body)
    }

    /// True when `/health` answers `{"status": "ok"}`.
    pub async fn health(&self) -> anyhow::Result<bool> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("could not reach {url}"))?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(body["status"] == "ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::Value;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn mock_prioritize(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("k") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid API Key"})));
        }
        match body["user_input"].as_str() {
            Some("boom") => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal pipeline error: no node registered for 'parse_tasks'",
                    "output": "Error occurred while prioritizing tasks.",
                    "prioritized_tasks": []
                })),
            ),
            Some(text) => (
                StatusCode::OK,
                Json(json!({
                    "output": format!("echo: {text}"),
                    "prioritized_tasks": [{"description": text, "due_date": "", "tags": [], "importance": "High", "priority_score": 8.0}],
                    "errors": []
                })),
            ),
            None => (StatusCode::BAD_REQUEST, Json(json!({"error": "missing"}))),
        }
    }

    async fn start_mock() -> SocketAddr {
        let app = Router::new()
            .route("/prioritize", post(mock_prioritize))
            .route("/health", get(|| async { Json(json!({"status": "ok"})) }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn prioritize_round_trip() {
        let addr = start_mock().await;
        let client = RemoteClient::new(&format!("http://{addr}/"), "k");
        let result = client.prioritize("call mom").await.unwrap();
        assert_eq!(result.output, "echo: call mom");
        assert_eq!(result.prioritized_tasks[0].priority_score, 8.0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn bad_key_is_reported() {
        let addr = start_mock().await;
        let err = RemoteClient::new(&format!("http://{addr}"), "wrong")
            .prioritize("x")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected the API key"));
    }

    #[tokio::test]
    async fn server_fault_carries_message() {
        let addr = start_mock().await;
        let err = RemoteClient::new(&format!("http://{addr}"), "k")
            .prioritize("boom")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no node registered"));
    }

    #[tokio::test]
    async fn health_check() {
        let addr = start_mock().await;
        assert!(RemoteClient::new(&format!("http://{addr}"), "").health().await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(RemoteClient::new(&format!("http://{addr}"), "k").health().await.is_err());
    }
}
