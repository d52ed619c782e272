use std::future::Future;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::consolidate::CanonicalEvidence;
use super::domain::Decision;
use super::policy;
use crate::config::{ReasoningConfig, RetryConfig};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const TEMPERATURE: f64 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoning service transport error: {0}")]
    Transport(String),
    #[error("reasoning service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("reasoning response is malformed: {0}")]
    Malformed(String),
}

/// One completion from the reasoning service, with its token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Seam over the reasoning service so the invoker and orchestrator can be
/// exercised against scripted responses.
pub trait ReasoningClient: Send + Sync {
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<Completion, ReasoningError>> + Send;
}

/// Messages-endpoint client for the hosted reasoning service.
pub struct HttpReasoningClient {
    http: reqwest::Client,
    config: ReasoningConfig,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl HttpReasoningClient {
    pub fn new(config: ReasoningConfig) -> Result<Self, ReasoningError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| ReasoningError::Transport(err.to_string()))?;

        Ok(Self { http, config })
    }
}

impl ReasoningClient for HttpReasoningClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, ReasoningError> {
        let api_key = self
            .config
            .api_key()
            .map_err(|err| ReasoningError::Transport(err.to_string()))?;

        let endpoint = format!(
            "{}/v1/messages",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": TEMPERATURE,
            "system": system,
            "messages": [ { "role": "user", "content": user } ]
        });

        let response = self
            .http
            .post(endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| ReasoningError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: MessagesResponse = response
            .json()
            .await
            .map_err(|err| ReasoningError::Malformed(err.to_string()))?;

        let text = payload
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();

        Ok(Completion {
            text,
            input_tokens: payload.usage.input_tokens,
            output_tokens: payload.usage.output_tokens,
        })
    }
}

/// Metrics for the attempt that produced the returned decision.
#[derive(Debug, Clone, Default)]
pub struct InvocationMetrics {
    /// Ordinal of the succeeding attempt (0 = first attempt succeeded).
    pub retries: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    pub raw_response: String,
}

/// Drives the reasoning service with bounded retries and strict
/// response-shape enforcement.
pub struct ReasoningInvoker<C> {
    client: C,
    retry: RetryConfig,
}

impl<C: ReasoningClient> ReasoningInvoker<C> {
    pub fn new(client: C, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Submits the evidence under the versioned policy prompt. Failed
    /// attempts are retried up to the configured budget; the last
    /// attempt's error propagates when the budget is exhausted.
    pub async fn invoke(
        &self,
        evidence: &CanonicalEvidence,
    ) -> Result<(Decision, InvocationMetrics), ReasoningError> {
        let serialized = serde_json::to_string_pretty(evidence)
            .map_err(|err| ReasoningError::Malformed(format!("evidence serialization: {err}")))?;
        let user = policy::user_prompt(&serialized);

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(&self.retry, attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let started = Instant::now();
            match self.attempt(&user).await {
                Ok((decision, mut metrics)) => {
                    metrics.retries = attempt;
                    metrics.latency_ms = started.elapsed().as_millis() as u64;
                    debug!(retries = attempt, "reasoning service returned a valid verdict");
                    return Ok((decision, metrics));
                }
                Err(err) => {
                    warn!(attempt, %err, "reasoning attempt failed");
                    last_error = Some(err);
                }
            }
        }

        // max_attempts >= 1, so at least one error was recorded.
        Err(last_error.unwrap_or_else(|| {
            ReasoningError::Transport("no reasoning attempt was made".to_string())
        }))
    }

    async fn attempt(&self, user: &str) -> Result<(Decision, InvocationMetrics), ReasoningError> {
        let completion = self.client.complete(policy::SYSTEM_PROMPT, user).await?;

        let body = extract_embedded_json(&completion.text).ok_or_else(|| {
            ReasoningError::Malformed("no structured object found in response".to_string())
        })?;
        let decision = Decision::from_structured(body)
            .map_err(|err| ReasoningError::Malformed(err.to_string()))?;

        let metrics = InvocationMetrics {
            retries: 0,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            latency_ms: 0,
            raw_response: completion.text,
        };

        Ok((decision, metrics))
    }
}

fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    if retry.base_delay.is_zero() {
        return Duration::ZERO;
    }
    let exponent = attempt.saturating_sub(1).min(16);
    let scaled = retry.base_delay.saturating_mul(1u32 << exponent);
    scaled.min(retry.max_delay.max(retry.base_delay))
}

/// Locates the single structured object embedded in the raw response text:
/// the span from the first `{` to the final `}` must parse as JSON.
fn extract_embedded_json(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}
