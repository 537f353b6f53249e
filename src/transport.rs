//! Blocking HTTP transport for the ZONT API.
//!
//! - `UreqTransport` performs exactly one POST attempt per call, bounded by a per-attempt timeout.
//! - `RetryTransport` wraps any `Transport` and absorbs transient failures (connection errors,
//!   timeouts, 429 and most 5xx statuses) with capped exponential backoff.
//!
//! Non-2xx statuses that are not retried are handed back as ordinary responses: the vendor
//! signals logical failures inside the JSON body, so interpreting them is left to the decoder.

use http::{HeaderMap, Request, Response, StatusCode};
use log::{debug, warn};
use rand::Rng;
use std::thread;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum TransportError {
    /// The attempt exceeded the per-request timeout.
    Timeout,
    /// DNS, connect or socket level failure.
    Connection(String),
    /// The request could not be sent at all (bad URI, TLS setup, protocol error).
    Request(String),
    /// The server answered with a retryable status.
    Status(u16),
    /// The response arrived but its body could not be read.
    Body(String),
    RetriesExhausted { attempts: u32, last: Box<TransportError> },
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout | TransportError::Connection(_) | TransportError::Status(_)
        )
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::Connection(s) => write!(f, "connection failed: {}", s),
            TransportError::Request(s) => write!(f, "request failed: {}", s),
            TransportError::Status(code) => write!(f, "server responded with http {}", code),
            TransportError::Body(s) => write!(f, "reading response body failed: {}", s),
            TransportError::RetriesExhausted { attempts, last } => {
                write!(f, "giving up after {} attempt(s): {}", attempts, last)
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::RetriesExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

impl From<ureq::Error> for TransportError {
    fn from(value: ureq::Error) -> Self {
        match value {
            ureq::Error::Timeout(_) => TransportError::Timeout,
            ureq::Error::Io(e) => TransportError::Connection(e.to_string()),
            ureq::Error::HostNotFound => TransportError::Connection("host not found".to_string()),
            ureq::Error::ConnectionFailed => TransportError::Connection("connection failed".to_string()),
            other => TransportError::Request(other.to_string()),
        }
    }
}

/// A single blocking HTTP exchange. Implementations must not retry on their own.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError>;
}

/// Production transport on a shared `ureq` agent. Only POST is issued; the vendor API has no other verb.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        UreqTransport {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        UreqTransport::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        let mut builder = self.agent.post(request.uri().to_string());
        for (name, value) in request.headers() {
            builder = builder.header(name.clone(), value.clone());
        }

        let response = builder.send(request.body().as_slice())?;
        let (parts, mut body) = response.into_parts();
        let bytes = body
            .read_to_vec()
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(Response::from_parts(parts, bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            min_wait: DEFAULT_MIN_WAIT,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry number `retry` (0-based): `min_wait * 2^retry` plus up to 25% jitter,
    /// never above `max_wait`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self
            .min_wait
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_wait);
        let jitter_ms = (base.as_millis() / 4) as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        (base + Duration::from_millis(jitter)).min(self.max_wait)
    }

    /// Wait before retry number `retry`. A server hint replaces the backoff but is still capped at `max_wait`.
    pub fn wait_before(&self, retry: u32, hinted: Option<Duration>) -> Duration {
        match hinted {
            Some(hint) => hint.min(self.max_wait),
            None => self.backoff(retry),
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

fn retry_after(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
    if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::SERVICE_UNAVAILABLE {
        return None;
    }
    headers
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Retries the wrapped transport; only exhaustion of the policy is surfaced to the caller.
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        RetryTransport { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<T: Transport> Transport for RetryTransport<T> {
    fn execute(&self, request: &Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (error, hinted_wait) = match self.inner.execute(request) {
                Ok(response) if is_retryable_status(response.status()) => {
                    let wait = retry_after(response.status(), response.headers());
                    (TransportError::Status(response.status().as_u16()), wait)
                }
                Ok(response) => {
                    if attempt > 1 {
                        debug!("POST {} succeeded on attempt {}", request.uri(), attempt);
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() => (e, None),
                Err(e) => return Err(e),
            };

            if attempt >= max_attempts {
                return Err(TransportError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let wait = self.policy.wait_before(attempt - 1, hinted_wait);
            warn!(
                "POST {} attempt {}/{} failed: {}; retrying in {:?}",
                request.uri(),
                attempt,
                max_attempts,
                error,
                wait
            );
            thread::sleep(wait);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub uri: String,
        pub headers: HeaderMap,
        pub body: Vec<u8>,
    }

    impl RecordedRequest {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).expect("request body is json")
        }

        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|v| v.to_str().ok())
        }
    }

    /// Replays canned replies in order and records every request it sees.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<Response<Vec<u8>>, TransportError>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: &str) -> Self {
            let response = Response::builder()
                .status(status)
                .body(body.as_bytes().to_vec())
                .expect("valid response");
            self.replies.lock().unwrap().push_back(Ok(response));
            self
        }

        pub fn fail(self, error: TransportError) -> Self {
            self.replies.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                uri: request.uri().to_string(),
                headers: request.headers().clone(),
                body: request.body().clone(),
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connection("no scripted reply left".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    fn post() -> Request<Vec<u8>> {
        Request::post("https://example.invalid/api/devices")
            .body(b"{}".to_vec())
            .unwrap()
    }

    fn body_of(response: Response<Vec<u8>>) -> String {
        String::from_utf8(response.into_body()).unwrap()
    }

    #[test]
    fn transient_failures_below_budget_are_absorbed() {
        // 3 retries allow 4 attempts: three failures followed by a success.
        let scripted = ScriptedTransport::new()
            .fail(TransportError::Timeout)
            .fail(TransportError::Connection("reset".into()))
            .reply(502, "bad gateway")
            .reply(200, r#"{"ok":true}"#);
        let transport = RetryTransport::new(scripted, quick_policy(3));

        let response = transport.execute(&post()).expect("success after retries");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response), r#"{"ok":true}"#);
        assert_eq!(transport.inner.calls(), 4);
    }

    #[test]
    fn failures_beyond_budget_surface_exhaustion() {
        let mut scripted = ScriptedTransport::new();
        for _ in 0..4 {
            scripted = scripted.fail(TransportError::Timeout);
        }
        scripted = scripted.reply(200, r#"{"ok":true}"#);
        let transport = RetryTransport::new(scripted, quick_policy(3));

        match transport.execute(&post()) {
            Err(TransportError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(*last, TransportError::Timeout));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(transport.inner.calls(), 4);
    }

    #[test]
    fn server_errors_exhaust_to_status() {
        let scripted = ScriptedTransport::new().reply(500, "boom").reply(503, "busy");
        let transport = RetryTransport::new(scripted, quick_policy(1));

        match transport.execute(&post()) {
            Err(TransportError::RetriesExhausted { attempts: 2, last }) => {
                assert!(matches!(*last, TransportError::Status(503)));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn client_errors_are_returned_without_retry() {
        let scripted = ScriptedTransport::new()
            .reply(403, r#"{"ok":false,"error":"forbidden"}"#)
            .reply(200, "unused");
        let transport = RetryTransport::new(scripted, quick_policy(5));

        let response = transport.execute(&post()).unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(transport.inner.calls(), 1);
    }

    #[test]
    fn not_implemented_is_not_retried() {
        let scripted = ScriptedTransport::new().reply(501, "nope");
        let transport = RetryTransport::new(scripted, quick_policy(5));

        assert_eq!(transport.execute(&post()).unwrap().status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(transport.inner.calls(), 1);
    }

    #[test]
    fn body_errors_are_not_retried() {
        let scripted = ScriptedTransport::new()
            .fail(TransportError::Body("truncated".into()))
            .reply(200, "unused");
        let transport = RetryTransport::new(scripted, quick_policy(5));

        assert!(matches!(transport.execute(&post()), Err(TransportError::Body(_))));
        assert_eq!(transport.inner.calls(), 1);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        };
        let first = policy.backoff(0);
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_millis(1250));
        let third = policy.backoff(2);
        assert!(third >= Duration::from_secs(4) && third <= Duration::from_secs(5));
        assert_eq!(policy.backoff(9), Duration::from_secs(30));
        assert_eq!(policy.max_attempts(), 11);
    }

    #[test]
    fn retry_after_only_honoured_for_throttling_statuses() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(
            retry_after(StatusCode::TOO_MANY_REQUESTS, &headers),
            Some(Duration::from_secs(7))
        );
        assert_eq!(retry_after(StatusCode::BAD_GATEWAY, &headers), None);

        let policy = RetryPolicy::default();
        assert_eq!(policy.wait_before(0, Some(Duration::from_secs(7))), Duration::from_secs(7));

        headers.insert(http::header::RETRY_AFTER, "86400".parse().unwrap());
        let hinted = retry_after(StatusCode::SERVICE_UNAVAILABLE, &headers);
        assert_eq!(hinted, Some(Duration::from_secs(86400)));
        assert_eq!(policy.wait_before(0, hinted), policy.max_wait);
    }
}
