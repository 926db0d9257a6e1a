/// LLM Client: the single point of entry for all model calls in the service.
///
/// ARCHITECTURAL RULE: handlers never talk to the provider directly.
/// Calls go through a `ResilientInvoker` wrapping a `ModelClient`, and every raw
/// response goes through `extract` before anything reads it.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod extract;
pub mod prompts;
pub mod retry;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Raw provider retry hint, e.g. `"2s"`. Parsed by the invoker.
        retry_delay: Option<String>,
    },

    #[error("Response body was not JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LlmError {
    /// Provider-reported HTTP status, if the failure got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            LlmError::Decode(_) => None,
        }
    }

    pub fn retry_delay(&self) -> Option<&str> {
        match self {
            LlmError::Api { retry_delay, .. } => retry_delay.as_deref(),
            _ => None,
        }
    }
}

/// A model endpoint that turns one prompt into a raw response envelope.
///
/// The envelope is returned untouched; `extract::extract` digs the text out.
/// Carried as `Arc<dyn ModelClient>` so tests can swap in stubs.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Value, LlmError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<Value>,
}

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Value, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body, retry_after));
        }

        let body = response.text().await?;
        let envelope: Value = serde_json::from_str(&body)?;
        debug!("Gemini call succeeded ({} bytes)", body.len());
        Ok(envelope)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Builds an `LlmError::Api` from a failed response.
///
/// The retry hint comes from the first `error.details[]` entry carrying a
/// `retryDelay` (Gemini's RetryInfo), else from the `Retry-After` header.
fn api_error(status: u16, body: &str, retry_after: Option<String>) -> LlmError {
    match serde_json::from_str::<GeminiErrorEnvelope>(body) {
        Ok(envelope) => {
            let hint = envelope
                .error
                .details
                .iter()
                .find_map(|d| d.get("retryDelay").and_then(Value::as_str))
                .map(str::to_string);
            LlmError::Api {
                status,
                message: envelope.error.message,
                retry_delay: hint.or(retry_after),
            }
        }
        Err(_) => LlmError::Api {
            status,
            message: body.to_string(),
            retry_delay: retry_after,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE_LIMIT_BODY: &str = r#"{
        "error": {
            "code": 429,
            "message": "Resource has been exhausted (e.g. check quota).",
            "status": "RESOURCE_EXHAUSTED",
            "details": [
                {"@type": "type.googleapis.com/google.rpc.QuotaFailure", "violations": []},
                {"@type": "type.googleapis.com/google.rpc.Help", "links": []},
                {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "2s"}
            ]
        }
    }"#;

    #[test]
    fn test_api_error_reads_retry_info() {
        let err = api_error(429, RATE_LIMIT_BODY, None);
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_delay(), Some("2s"));
        assert!(err.to_string().contains("Resource has been exhausted"));
    }

    #[test]
    fn test_api_error_prefers_body_hint_over_header() {
        let err = api_error(429, RATE_LIMIT_BODY, Some("30".to_string()));
        assert_eq!(err.retry_delay(), Some("2s"));
    }

    #[test]
    fn test_api_error_falls_back_to_retry_after_header() {
        let body = r#"{"error": {"code": 503, "message": "The model is overloaded."}}"#;
        let err = api_error(503, body, Some("7".to_string()));
        assert_eq!(err.retry_delay(), Some("7"));
    }

    #[test]
    fn test_api_error_keeps_unparseable_body_as_message() {
        let err = api_error(502, "<html>Bad Gateway</html>", None);
        match err {
            LlmError::Api {
                status,
                message,
                retry_delay,
            } => {
                assert_eq!(status, 502);
                assert_eq!(message, "<html>Bad Gateway</html>");
                assert!(retry_delay.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = GeminiClient::new(
            "key".to_string(),
            "gemini-2.5-flash".to_string(),
            "https://example.test/v1beta/".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.model_name(), "gemini-2.5-flash");
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
        );
    }
}
