use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::{FinishReason, ProviderAdapter, Request, Response, Role, Usage};
use triage_types::TriageError;

const PROVIDER: &str = "anthropic";

// ---------------------------------------------------------------------------
// AnthropicAdapter — Messages API
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
    timeout: Duration,
}

impl AnthropicAdapter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            default_model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn transport_error(&self, e: reqwest::Error) -> TriageError {
        if e.is_timeout() {
            TriageError::RequestTimeout {
                provider: PROVIDER.into(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            TriageError::ProviderError {
                provider: PROVIDER.into(),
                status: 0,
                message: e.to_string(),
                retryable: true,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request translation
// ---------------------------------------------------------------------------

fn build_request_body(request: &Request) -> serde_json::Value {
    // System messages are hoisted into the top-level `system` field.
    let system = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut body = json!({
        "model": request.model,
        "max_tokens": request.max_tokens.unwrap_or(4096),
        "messages": messages,
    });

    if !system.is_empty() {
        body["system"] = json!(system);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = json!(temp);
    }

    body
}

// ---------------------------------------------------------------------------
// Response translation
// ---------------------------------------------------------------------------

fn parse_response(body: &serde_json::Value) -> Result<Response, TriageError> {
    let id = body["id"].as_str().unwrap_or("").to_string();
    let model = body["model"].as_str().unwrap_or("").to_string();

    let text = body["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .filter_map(|b| b["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let finish_reason = match body["stop_reason"].as_str() {
        Some("end_turn") | None => FinishReason::EndTurn,
        Some("max_tokens") => FinishReason::MaxTokens,
        Some("stop_sequence") => FinishReason::StopSequence,
        Some(_) => FinishReason::Other,
    };

    let input_tokens = body["usage"]["input_tokens"].as_u64().unwrap_or(0);
    let output_tokens = body["usage"]["output_tokens"].as_u64().unwrap_or(0);

    Ok(Response {
        id,
        text,
        usage: Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        },
        model,
        finish_reason,
    })
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_error(status: reqwest::StatusCode, retry_after: Option<&str>, body: &str) -> TriageError {
    let status_u16 = status.as_u16();
    match status_u16 {
        429 => {
            let retry_ms = retry_after
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|s| (s * 1000.0) as u64)
                .unwrap_or(1000);
            TriageError::RateLimited {
                provider: PROVIDER.into(),
                retry_after_ms: retry_ms,
            }
        }
        401 | 403 => TriageError::AuthError {
            provider: PROVIDER.into(),
        },
        500..=599 => TriageError::ProviderError {
            provider: PROVIDER.into(),
            status: status_u16,
            message: extract_error_message(body),
            retryable: true,
        },
        _ => TriageError::ProviderError {
            provider: PROVIDER.into(),
            status: status_u16,
            message: extract_error_message(body),
            retryable: false,
        },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// ProviderAdapter implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    async fn complete(&self, request: &Request) -> Result<Response, TriageError> {
        let body = build_request_body(request);

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let response_body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(map_error(status, retry_after.as_deref(), &response_body));
        }

        let json: serde_json::Value =
            serde_json::from_str(&response_body).map_err(|e| TriageError::ProviderError {
                provider: PROVIDER.into(),
                status: status.as_u16(),
                message: format!("Failed to parse response JSON: {e}"),
                retryable: false,
            })?;

        parse_response(&json)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    #[test]
    fn system_messages_are_hoisted() {
        let req = Request {
            model: "claude-3-5-haiku-latest".into(),
            messages: vec![
                Message::system("You are a task prioritization expert."),
                Message::user("Prioritize these tasks: []"),
            ],
            max_tokens: None,
            temperature: Some(0.0),
        };
        let body = build_request_body(&req);

        assert_eq!(body["system"], "You are a task prioritization expert.");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn no_system_field_without_system_messages() {
        let req = Request {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            max_tokens: Some(10),
            temperature: None,
        };
        let body = build_request_body(&req);
        assert!(body.get("system").is_none());
        assert!(body.get("temperature").is_none());
        assert_eq!(body["max_tokens"], 10);
    }

    #[test]
    fn parse_response_joins_text_blocks() {
        let resp = parse_response(&json!({
            "id": "msg_01",
            "model": "claude-3-5-haiku-latest",
            "content": [
                { "type": "text", "text": "Here you go:\n" },
                { "type": "text", "text": "```json\n[]\n```" }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        }))
        .unwrap();

        assert_eq!(resp.id, "msg_01");
        assert_eq!(resp.text, "Here you go:\n```json\n[]\n```");
        assert_eq!(resp.finish_reason, FinishReason::EndTurn);
        assert_eq!(resp.usage.total_tokens, 15);
    }

    #[test]
    fn parse_response_max_tokens() {
        let resp = parse_response(&json!({
            "content": [{ "type": "text", "text": "cut" }],
            "stop_reason": "max_tokens"
        }))
        .unwrap();
        assert_eq!(resp.finish_reason, FinishReason::MaxTokens);
    }

    #[test]
    fn error_mapping_uses_retry_after_header() {
        let err = map_error(reqwest::StatusCode::TOO_MANY_REQUESTS, Some("2"), "");
        assert!(matches!(
            err,
            TriageError::RateLimited {
                retry_after_ms: 2000,
                ..
            }
        ));
    }

    #[test]
    fn error_mapping_overloaded_is_retryable() {
        let err = map_error(
            reqwest::StatusCode::from_u16(529).unwrap(),
            None,
            r#"{"error": {"type": "overloaded_error", "message": "Overloaded"}}"#,
        );
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn error_mapping_auth() {
        let err = map_error(reqwest::StatusCode::UNAUTHORIZED, None, "");
        assert!(matches!(err, TriageError::AuthError { .. }));
    }
}
