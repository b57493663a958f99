/// Upstream notifier
///
/// Delivers a processed note to the external notes service with
/// `POST {base_url}/notes` and body `{"note_id": .., "body": ..}`.
///
/// # Retry Policy
///
/// Up to `max_attempts` attempts (default 3), each bounded by
/// `attempt_timeout` (default 3s). Timeouts, transport errors, non-2xx
/// statuses and success replies that are not JSON are all retried. The wait before retry `n` is
/// `clamp(multiplier * 2^(n+1), min_wait, max_wait)`:
///
/// ```text
/// attempt 1 ──fail──> wait 4s ──> attempt 2 ──fail──> wait 8s ──> attempt 3
/// ```
///
/// The last error is returned once attempts run out.
///
/// # Example
///
/// ```no_run
/// use contactnotes_worker::upstream::{HttpTransport, RetryPolicy, UpstreamNotifier};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let notifier = UpstreamNotifier::new(
///     Arc::new(HttpTransport::new()?),
///     "http://127.0.0.1:5000",
///     RetryPolicy::default(),
/// );
///
/// let reply = notifier.notify(42, "Call back on Monday").await?;
/// println!("upstream replied: {}", reply);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upstream delivery errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Upstream returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Upstream reply is not valid JSON: {0}")]
    InvalidBody(String),
}

/// Raw reply from the upstream endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One HTTP attempt
///
/// Implementations must not retry; [`UpstreamNotifier`] owns the retry loop.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<UpstreamResponse, UpstreamError>;
}

/// `reqwest` backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("contactnotes-worker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                UpstreamError::Timeout(timeout)
            } else {
                UpstreamError::Transport(e.to_string())
            }
        };

        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_err)?;

        Ok(UpstreamResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Retry schedule for upstream delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Bound on a single attempt
    pub attempt_timeout: Duration,

    pub multiplier: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(3),
            multiplier: Duration::from_secs(1),
            min_wait: Duration::from_secs(4),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry `retry` (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_add(1));
        self.multiplier
            .saturating_mul(factor)
            .clamp(self.min_wait, self.max_wait)
    }
}

/// Posts notes upstream with retries
#[derive(Clone)]
pub struct UpstreamNotifier {
    transport: Arc<dyn UpstreamTransport>,
    endpoint: String,
    policy: RetryPolicy,
}

impl UpstreamNotifier {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        base_url: &str,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            endpoint: format!("{}/notes", base_url.trim_end_matches('/')),
            policy,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Delivers one note, retrying per the policy
    ///
    /// Returns the parsed JSON reply. An empty success body yields
    /// `Value::Null`; any other body must parse as JSON.
    pub async fn notify(&self, note_id: i64, body: &str) -> Result<Value, UpstreamError> {
        let payload = json!({ "note_id": note_id, "body": body });
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(&payload).await {
                Ok((response, reply)) => {
                    tracing::debug!(
                        note_id,
                        attempt,
                        status = response.status,
                        "Upstream accepted note"
                    );
                    return Ok(reply);
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        note_id,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upstream delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        note_id,
                        attempts = attempt,
                        error = %e,
                        "Upstream delivery failed, giving up"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, payload: &Value) -> Result<(UpstreamResponse, Value), UpstreamError> {
        let timeout = self.policy.attempt_timeout;

        let response = tokio::time::timeout(
            timeout,
            self.transport.post_json(&self.endpoint, payload, timeout),
        )
        .await
        .map_err(|_| UpstreamError::Timeout(timeout))??;

        if !response.is_success() {
            return Err(UpstreamError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let reply = parse_reply(&response.body)?;
        Ok((response, reply))
    }
}

fn parse_reply(body: &[u8]) -> Result<Value, UpstreamError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(body).map_err(|e| UpstreamError::InvalidBody(e.to_string()))
}
