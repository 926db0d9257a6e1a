//! Resilient Invoker: retries model calls that fail with an overload signal.
//!
//! Only 429 (rate limited) and 503 (unavailable) are retried. Each wait is the
//! provider's retry hint when it parses, otherwise the fixed base delay; there is
//! no exponential growth between attempts.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::llm_client::{LlmError, ModelClient};

const TOO_MANY_REQUESTS: u16 = 429;
const SERVICE_UNAVAILABLE: u16 = 503;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(4000),
        }
    }
}

/// Wraps a `ModelClient` with the retry policy. Cheap to clone.
#[derive(Clone)]
pub struct ResilientInvoker {
    client: Arc<dyn ModelClient>,
    policy: RetryPolicy,
}

impl ResilientInvoker {
    pub fn new(client: Arc<dyn ModelClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Sends `prompt`, retrying overload failures while attempts remain.
    /// Any other failure, or the last overload failure, is returned unchanged.
    pub async fn invoke(&self, prompt: &str) -> Result<Value, LlmError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.client.generate(prompt).await {
                Ok(response) => return Ok(response),
                Err(err) if is_retryable(&err) && attempt < max_attempts => {
                    let wait = retry_wait(&err, self.policy.base_delay);
                    warn!(
                        "Model overloaded (status {}). Retrying in {}ms [attempt {}/{}]",
                        err.status().unwrap_or_default(),
                        wait.as_millis(),
                        attempt,
                        max_attempts
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_retryable(err: &LlmError) -> bool {
    matches!(err.status(), Some(TOO_MANY_REQUESTS | SERVICE_UNAVAILABLE))
}

fn retry_wait(err: &LlmError, base_delay: Duration) -> Duration {
    err.retry_delay()
        .and_then(parse_retry_delay)
        .unwrap_or(base_delay)
}

/// Parses a provider retry hint such as `"2s"`, `"1.5s"` or `"30"` (seconds).
/// Zero, negative, non-finite or malformed hints yield `None`.
pub fn parse_retry_delay(hint: &str) -> Option<Duration> {
    let trimmed = hint.trim();
    let number = trimmed.strip_suffix('s').unwrap_or(trimmed).trim();
    let seconds: f64 = number.parse().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays scripted outcomes in order and counts calls.
    struct ScriptedClient {
        outcomes: Mutex<VecDeque<Result<Value, LlmError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClient {
        fn new(outcomes: Vec<Result<Value, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn generate(&self, _prompt: &str) -> Result<Value, LlmError> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted client ran out of outcomes")
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn api_err(status: u16, retry_delay: Option<&str>) -> LlmError {
        LlmError::Api {
            status,
            message: "boom".to_string(),
            retry_delay: retry_delay.map(str::to_string),
        }
    }

    fn invoker(client: Arc<ScriptedClient>) -> ResilientInvoker {
        ResilientInvoker::new(client, RetryPolicy::default())
    }

    #[test]
    fn test_parse_retry_delay_variants() {
        assert_eq!(parse_retry_delay("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_delay(" 1.5s "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_delay("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_delay("0s"), None);
        assert_eq!(parse_retry_delay("-1s"), None);
        assert_eq!(parse_retry_delay("soon"), None);
        assert_eq!(parse_retry_delay(""), None);
        assert_eq!(parse_retry_delay("NaNs"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_provider_hint_then_succeeds() {
        let client = ScriptedClient::new(vec![
            Err(api_err(429, Some("2s"))),
            Ok(serde_json::json!({"ok": true})),
        ]);
        let started = Instant::now();

        let result = invoker(client.clone()).invoke("prompt").await.unwrap();

        assert_eq!(result, serde_json::json!({"ok": true}));
        assert_eq!(client.calls(), 2, "no third attempt after success");
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2), "waited {waited:?}");
        assert!(waited < Duration::from_millis(2100), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_hint_uses_base_delay() {
        let client = ScriptedClient::new(vec![
            Err(api_err(503, None)),
            Ok(serde_json::json!({})),
        ]);
        let started = Instant::now();

        invoker(client.clone()).invoke("prompt").await.unwrap();

        assert_eq!(client.calls(), 2);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(4000), "waited {waited:?}");
        assert!(waited < Duration::from_millis(4100), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_hint_uses_base_delay() {
        let client = ScriptedClient::new(vec![
            Err(api_err(429, Some("whenever"))),
            Ok(serde_json::json!({})),
        ]);
        let started = Instant::now();

        invoker(client).invoke("prompt").await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_status_fails_immediately() {
        let client = ScriptedClient::new(vec![Err(api_err(400, Some("2s")))]);
        let started = Instant::now();

        let err = invoker(client.clone()).invoke("prompt").await.unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(client.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_other_than_503_are_not_retried() {
        let client = ScriptedClient::new(vec![Err(api_err(500, None))]);

        let err = invoker(client.clone()).invoke("prompt").await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_propagate_last_error() {
        let client = ScriptedClient::new(vec![
            Err(api_err(429, Some("1s"))),
            Err(api_err(503, Some("1s"))),
            Err(api_err(429, Some("1s"))),
        ]);
        let started = Instant::now();

        let err = invoker(client.clone()).invoke("prompt").await.unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert_eq!(client.calls(), 3);
        // Two waits between three attempts, none after the last.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(2), "waited {waited:?}");
        assert!(waited < Duration::from_secs(3), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_policy_never_waits() {
        let client = ScriptedClient::new(vec![Err(api_err(429, Some("2s")))]);
        let invoker = ResilientInvoker::new(
            client.clone(),
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(4000),
            },
        );

        assert!(invoker.invoke("prompt").await.is_err());
        assert_eq!(client.calls(), 1);
    }
}
