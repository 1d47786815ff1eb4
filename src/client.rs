//! HTTP access layer: one authenticated GET with retry, backoff, and
//! rate limiting.
//!
//! The layer is split along a narrow seam:
//!
//! - [`Transport`] sends a single GET and reports what came back
//!   (status, `Retry-After`, body). [`HttpTransport`] is the `reqwest`
//!   implementation.
//! - [`ApiClient`] owns the policy: cooperative 429 waits, fatal 401,
//!   bounded retries with exponential backoff, and a shared preventive
//!   throttle paid after every successful call.
//! - [`Executor`] is what the pipeline stages program against, so they can
//!   be exercised with scripted responses instead of a live platform.
//!
//! # Policy summary
//!
//! | Response | Handling |
//! |----------|----------|
//! | 429 | sleep `Retry-After` (default 60s), re-issue, budget untouched |
//! | 401 | fatal [`HarvestError::Auth`], never retried |
//! | other >= 400 | retry with `2^attempt` seconds backoff, then typed failure |
//! | timeout / transport | same retry policy, then [`HarvestError::Timeout`] / [`HarvestError::Transport`] |
//! | success | parse JSON, pay the shared rate-limit delay, return |

use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{RunConfig, Settings};
use crate::error::{HarvestError, Result};

/// Fallback cooperative wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Channel-listing endpoint for an account.
pub fn inboxes_endpoint(account: &str) -> String {
    format!("/api/v1/accounts/{account}/inboxes")
}

/// Conversation-listing endpoint for an account.
pub fn conversations_endpoint(account: &str) -> String {
    format!("/api/v1/accounts/{account}/conversations")
}

/// Message-listing endpoint for one conversation.
pub fn messages_endpoint(account: &str, conversation_id: i64) -> String {
    format!("/api/v1/accounts/{account}/conversations/{conversation_id}/messages")
}

/// What a single GET attempt produced.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,

    /// Parsed `Retry-After` header in seconds, when present and valid.
    pub retry_after: Option<u64>,

    /// Raw response body.
    pub body: String,
}

/// Connection-level failure of a single attempt.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// The request exceeded the bounded timeout.
    Timeout,

    /// Any other connection-level failure.
    Connect(String),
}

/// Sends one GET and reports the outcome, nothing more.
///
/// The retry/backoff/throttle policy lives above this seam in
/// [`ApiClient`], which keeps the policy testable with scripted transports.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Issues a single GET against `url` with the given query string.
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport with the fixed header set baked in.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport carrying the access token header and a bounded
    /// per-request timeout.
    pub fn new(access_token: &str, timeout: Duration) -> Result<Self> {
        use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

        let mut token = HeaderValue::from_str(access_token)
            .map_err(|e| HarvestError::transport("client setup", e.to_string()))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("api_access_token", token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| HarvestError::transport("client setup", e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// The capability the pipeline stages program against.
#[allow(async_fn_in_trait)]
pub trait Executor {
    /// Issues one authenticated GET under the full retry/backoff/throttle
    /// policy and returns the parsed JSON payload.
    async fn execute(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value>;
}

/// Shared preventive throttle.
///
/// Every successful call pays the delay through one gate per client;
/// concurrent workers serialize on the gate rather than sleeping
/// privately.
struct Throttle {
    delay: Duration,
    gate: Mutex<()>,
}

impl Throttle {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            gate: Mutex::new(()),
        }
    }

    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        let _gate = self.gate.lock().await;
        tokio::time::sleep(self.delay).await;
    }
}

/// Authenticated API client applying the full request policy.
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    max_retries: u32,
    backoff_base: Duration,
    throttle: Throttle,
}

impl ApiClient<HttpTransport> {
    /// Builds a client for a live platform from connection settings.
    pub fn new(settings: &Settings, config: &RunConfig) -> Result<Self> {
        let transport = HttpTransport::new(&settings.access_token, config.request_timeout)?;
        Ok(Self::with_transport(
            transport,
            settings.api_url.clone(),
            config,
        ))
    }
}

impl<T: Transport> ApiClient<T> {
    /// Builds a client over an arbitrary transport.
    pub fn with_transport(transport: T, base_url: impl Into<String>, config: &RunConfig) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            max_retries: config.max_retries.max(1),
            backoff_base: config.backoff_base,
            throttle: Throttle::new(config.rate_limit_delay),
        }
    }
}

impl<T: Transport> Executor for ApiClient<T> {
    async fn execute(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut attempt: u32 = 0;

        loop {
            let outcome = self.transport.get(&url, query).await;
            debug!(endpoint, attempt, ok = outcome.is_ok(), "request issued");

            match outcome {
                Ok(response) => match response.status {
                    429 => {
                        // Cooperative backoff signal, not a failure: wait
                        // and re-issue without touching the retry budget.
                        let wait = response.retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                        warn!(endpoint, wait_secs = wait, "rate limited, waiting");
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                    }
                    401 => return Err(HarvestError::Auth),
                    status if status >= 400 => {
                        warn!(
                            endpoint,
                            status,
                            attempt = attempt + 1,
                            max = self.max_retries,
                            "request failed"
                        );
                        if attempt + 1 >= self.max_retries {
                            return Err(HarvestError::http(status, endpoint));
                        }
                        tokio::time::sleep(self.backoff_base * 2u32.pow(attempt)).await;
                        attempt += 1;
                    }
                    _ => {
                        let value: Value = serde_json::from_str(&response.body)?;
                        self.throttle.pause().await;
                        return Ok(value);
                    }
                },
                Err(TransportError::Timeout) => {
                    warn!(
                        endpoint,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        "request timed out"
                    );
                    if attempt + 1 >= self.max_retries {
                        return Err(HarvestError::timeout(endpoint));
                    }
                    tokio::time::sleep(self.backoff_base * 2u32.pow(attempt)).await;
                    attempt += 1;
                }
                Err(TransportError::Connect(reason)) => {
                    warn!(
                        endpoint,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        reason,
                        "transport error"
                    );
                    if attempt + 1 >= self.max_retries {
                        return Err(HarvestError::transport(endpoint, reason));
                    }
                    tokio::time::sleep(self.backoff_base * 2u32.pow(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that replays a scripted sequence of outcomes.
    struct ScriptedTransport {
        script: StdMutex<VecDeque<std::result::Result<RawResponse, TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(
            script: Vec<std::result::Result<RawResponse, TransportError>>,
        ) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            _url: &str,
            _query: &[(&str, String)],
        ) -> std::result::Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("transport script exhausted")
        }
    }

    fn ok(body: &str) -> std::result::Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: 200,
            retry_after: None,
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> std::result::Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: code,
            retry_after: None,
            body: String::new(),
        })
    }

    fn rate_limited() -> std::result::Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: 429,
            retry_after: Some(0),
            body: String::new(),
        })
    }

    /// Config with all delays zeroed so tests run instantly.
    fn fast_config() -> RunConfig {
        RunConfig::new()
            .with_rate_limit_delay(Duration::ZERO)
            .with_backoff_base(Duration::ZERO)
    }

    fn client(
        script: Vec<std::result::Result<RawResponse, TransportError>>,
    ) -> ApiClient<ScriptedTransport> {
        ApiClient::with_transport(
            ScriptedTransport::new(script),
            "https://support.example.com",
            &fast_config(),
        )
    }

    #[tokio::test]
    async fn test_success_returns_parsed_json() {
        let client = client(vec![ok(r#"{"payload": [1, 2, 3]}"#)]);
        let value = client.execute("/api/v1/x", &[]).await.unwrap();
        assert_eq!(value["payload"][2], 3);
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_429_does_not_consume_retry_budget() {
        // Five consecutive 429s exceed the 3-attempt budget; the request
        // must still succeed because cooperative waits are exempt.
        let client = client(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
            ok(r#"{"ok": true}"#),
        ]);
        let value = client.execute("/api/v1/x", &[]).await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(client.transport.calls(), 6);
    }

    #[tokio::test]
    async fn test_401_is_fatal_and_never_retried() {
        let client = client(vec![status(401), ok("{}")]);
        let err = client.execute("/api/v1/x", &[]).await.unwrap_err();
        assert!(matches!(err, HarvestError::Auth));
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_http_error_retried_then_typed_failure() {
        let client = client(vec![status(500), status(500), status(500)]);
        let err = client.execute("/api/v1/x", &[]).await.unwrap_err();
        match err {
            HarvestError::Http { status, endpoint } => {
                assert_eq!(status, 500);
                assert_eq!(endpoint, "/api/v1/x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_http_error_recovers_within_budget() {
        let client = client(vec![status(502), status(502), ok(r#"{"ok": 1}"#)]);
        let value = client.execute("/api/v1/x", &[]).await.unwrap();
        assert_eq!(value["ok"], 1);
        assert_eq!(client.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_timeout_exhausts_budget() {
        let client = client(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
        ]);
        let err = client.execute("/api/v1/x", &[]).await.unwrap_err();
        assert!(matches!(err, HarvestError::Timeout { .. }));
        assert_eq!(client.transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_retried_then_typed() {
        let client = client(vec![
            Err(TransportError::Connect("connection reset".into())),
            Err(TransportError::Connect("connection reset".into())),
            Err(TransportError::Connect("connection reset".into())),
        ]);
        let err = client.execute("/api/v1/x", &[]).await.unwrap_err();
        match err {
            HarvestError::Transport { reason, .. } => {
                assert!(reason.contains("connection reset"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_an_error() {
        let client = client(vec![ok("<html>not json</html>")]);
        let err = client.execute("/api/v1/x", &[]).await.unwrap_err();
        assert!(matches!(err, HarvestError::Json(_)));
    }

    #[test]
    fn test_endpoint_builders() {
        assert_eq!(inboxes_endpoint("42"), "/api/v1/accounts/42/inboxes");
        assert_eq!(
            conversations_endpoint("42"),
            "/api/v1/accounts/42/conversations"
        );
        assert_eq!(
            messages_endpoint("42", 5001),
            "/api/v1/accounts/42/conversations/5001/messages"
        );
    }
}
