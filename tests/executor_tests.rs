//! Attempt-loop timing and cancellation, driven by an in-memory transport on a
//! paused clock.

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use steadycall::transport::{Transport, TransportRequest, TransportResponse};
use steadycall::{CallConfig, Client, Error, ErrorKind, RetryPolicy};
use tokio::time::Instant;

enum Step {
    Respond(u16, &'static str, &'static str),
    Fail(&'static str),
    Hang,
}

/// Replays a script of outcomes and records when each request arrived.
struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: fn() -> Step,
    seen: Mutex<Vec<(Instant, HeaderMap)>>,
    cancelled: Arc<AtomicBool>,
}

impl ScriptedTransport {
    fn new(script: Vec<Step>, fallback: fn() -> Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            seen: Mutex::new(Vec::new()),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    fn arrivals(&self) -> Vec<Instant> {
        self.seen.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    fn headers(&self) -> Vec<HeaderMap> {
        self.seen.lock().unwrap().iter().map(|(_, h)| h.clone()).collect()
    }
}

/// Flags cancellation when the in-flight send future is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &TransportRequest) -> steadycall::Result<TransportResponse> {
        self.seen
            .lock()
            .unwrap()
            .push((Instant::now(), request.headers.clone()));
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(self.fallback);

        match step {
            Step::Respond(status, content_type, body) => {
                let mut headers = HeaderMap::new();
                headers.insert("content-type", HeaderValue::from_static(content_type));
                Ok(TransportResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    headers,
                    body: body.to_string(),
                })
            }
            Step::Fail(message) => Err(Error::transport(message)),
            Step::Hang => {
                let _guard = DropFlag(self.cancelled.clone());
                std::future::pending().await
            }
        }
    }
}

fn client(transport: Arc<ScriptedTransport>, policy: RetryPolicy) -> Client {
    Client::builder()
        .base_url("https://api.example.com")
        .unwrap()
        .retry_policy(policy)
        .transport(transport)
        .build()
        .unwrap()
}

fn server_error() -> Step {
    Step::Respond(500, "text/plain", "Server error")
}

#[tokio::test(start_paused = true)]
async fn test_persistent_500_makes_four_attempts_with_backoff() {
    let transport = ScriptedTransport::new(vec![], server_error);
    let policy = RetryPolicy::new(3, Duration::from_millis(1000), Duration::from_millis(30_000));
    let client = client(transport.clone(), policy);

    let err = client.fetch::<serde_json::Value>("/reports").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

    let arrivals = transport.arrivals();
    assert_eq!(arrivals.len(), 4);

    // Gaps follow 1s, 2s, 4s with at most 10% jitter.
    for (i, base_ms) in [1000u64, 2000, 4000].into_iter().enumerate() {
        let gap = arrivals[i + 1] - arrivals[i];
        assert!(gap >= Duration::from_millis(base_ms), "gap {i}: {gap:?}");
        assert!(gap <= Duration::from_millis(base_ms * 11 / 10 + 1), "gap {i}: {gap:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_bad_request_makes_one_attempt() {
    let transport = ScriptedTransport::new(
        vec![Step::Respond(400, "application/json", r#"{"error":"invalid"}"#)],
        server_error,
    );
    let client = client(transport.clone(), RetryPolicy::default());

    let err = client.fetch::<serde_json::Value>("/reports").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Client);
    assert_eq!(err.body(), Some(&json!({"error": "invalid"})));
    assert_eq!(transport.arrivals().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_means_single_attempt() {
    let transport = ScriptedTransport::new(vec![], || Step::Fail("connection reset"));
    let client = client(transport.clone(), RetryPolicy::none());

    let err = client.fetch::<serde_json::Value>("/reports").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(transport.arrivals().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_on_last_attempt_is_terminal() {
    let transport = ScriptedTransport::new(
        vec![server_error(), Step::Fail("connection reset")],
        server_error,
    );
    let policy = RetryPolicy::new(1, Duration::from_millis(100), Duration::from_secs(1));
    let client = client(transport.clone(), policy);

    let err = client.fetch::<serde_json::Value>("/reports").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(transport.arrivals().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_settles_at_deadline_and_cancels_transport() {
    let transport = ScriptedTransport::new(vec![], || Step::Hang);
    let client = client(transport.clone(), RetryPolicy::none());

    let start = Instant::now();
    let err = client
        .fetch_with::<serde_json::Value>(
            "/reports",
            CallConfig::new().with_timeout(Duration::from_millis(2000)),
        )
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, Error::Timeout { after } if after == Duration::from_millis(2000)));
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(elapsed >= Duration::from_millis(2000));
    assert!(elapsed < Duration::from_millis(2100));
    assert!(transport.cancelled.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_then_success() {
    let transport = ScriptedTransport::new(
        vec![
            Step::Hang,
            Step::Respond(200, "application/json", r#"{"id": 9}"#),
        ],
        server_error,
    );
    let policy = RetryPolicy::new(2, Duration::from_millis(500), Duration::from_secs(5));
    let client = Client::builder()
        .base_url("https://api.example.com")
        .unwrap()
        .retry_policy(policy)
        .timeout(Duration::from_secs(1))
        .transport(transport.clone())
        .build()
        .unwrap();

    let response = client.fetch::<serde_json::Value>("/reports").await.unwrap();
    assert_eq!(response.data, json!({"id": 9}));
    assert_eq!(response.attempts, 2);
    assert!(response.latency >= Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_decode_failure_is_not_retried() {
    let transport = ScriptedTransport::new(
        vec![Step::Respond(200, "application/json", "not json")],
        server_error,
    );
    let client = client(transport.clone(), RetryPolicy::default());

    let err = client.fetch::<serde_json::Value>("/reports").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.raw_response(), Some("not json"));
    assert_eq!(transport.arrivals().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_call_keeps_its_snapshot() {
    let transport = ScriptedTransport::new(
        vec![
            server_error(),
            Step::Respond(200, "application/json", "{}"),
        ],
        || Step::Respond(200, "application/json", "{}"),
    );
    let client = client(transport.clone(), RetryPolicy::default());
    client.set_auth_token("old").unwrap();

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.fetch::<serde_json::Value>("/reports").await })
    };

    while transport.arrivals().is_empty() {
        tokio::task::yield_now().await;
    }
    client.set_auth_token("new").unwrap();

    let response = call.await.unwrap().unwrap();
    assert_eq!(response.attempts, 2);

    client.fetch::<serde_json::Value>("/reports").await.unwrap();

    let tokens: Vec<_> = transport
        .headers()
        .iter()
        .map(|h| h["authorization"].to_str().unwrap().to_string())
        .collect();
    assert_eq!(tokens, vec!["Bearer old", "Bearer old", "Bearer new"]);
}
