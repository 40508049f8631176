//! The attempt loop.
//!
//! Each attempt sends the request (raced against the per-attempt timeout),
//! classifies the outcome, then either returns, sleeps and tries again, or
//! gives up. Attempts of one call never overlap.

use crate::config::PreparedCall;
use crate::decode;
use crate::notify::{Notifier, FAILURE_TITLE};
use crate::rate_limit::RateLimitConfig;
use crate::transport::{Transport, TransportResponse};
use crate::{Error, Response, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Where an attempt ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// Still in flight.
    Pending,
    /// Decoded successfully.
    Success,
    /// Failed, another attempt follows after a backoff.
    RetryableFailure,
    /// Failed, the call ends with this error.
    TerminalFailure,
}

/// Book-keeping for one attempt.
#[derive(Debug, Clone)]
pub(crate) struct AttemptState {
    /// 1-indexed attempt number.
    number: u32,
    /// When the attempt was sent.
    started_at: Instant,
    outcome: AttemptOutcome,
}

impl AttemptState {
    fn start(number: u32) -> Self {
        Self {
            number,
            started_at: Instant::now(),
            outcome: AttemptOutcome::Pending,
        }
    }

    fn settle(&mut self, outcome: AttemptOutcome) {
        self.outcome = outcome;
        tracing::debug!(
            attempt = self.number,
            outcome = ?self.outcome,
            elapsed_ms = self.started_at.elapsed().as_millis(),
            "Attempt settled"
        );
    }
}

/// Drives prepared calls through a [`Transport`].
#[derive(Clone)]
pub(crate) struct RequestExecutor {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    rate_limit: RateLimitConfig,
}

impl RequestExecutor {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            transport,
            notifier,
            rate_limit,
        }
    }

    /// Runs the attempt loop for `call`.
    pub(crate) async fn execute<T>(&self, call: PreparedCall) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        let method = &call.request.method;
        let url = &call.request.url;
        let mut attempt = 1;

        loop {
            let mut state = AttemptState::start(attempt);

            tracing::debug!(
                method = %method,
                url = %url,
                attempt,
                "Executing HTTP request"
            );

            let error = match self.send_once(&call).await {
                Ok(response) if response.status.is_success() => {
                    let latency = started.elapsed();
                    tracing::info!(
                        status = response.status.as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt,
                        "Received HTTP response"
                    );

                    match decode::decode_success::<T>(&response) {
                        Ok(data) => {
                            state.settle(AttemptOutcome::Success);
                            return Ok(Response {
                                data,
                                raw_body: response.body,
                                status: response.status,
                                headers: response.headers,
                                latency,
                                attempts: attempt,
                            });
                        }
                        Err(e) => {
                            // The server succeeded; the payload is wrong. Retrying won't fix it.
                            state.settle(AttemptOutcome::TerminalFailure);
                            return Err(self.fail(&call, e));
                        }
                    }
                }
                Ok(response) => decode::error_from_response(response, &self.rate_limit),
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt,
                method = %method,
                path = %url.path(),
                "Request failed"
            );

            if !call.retry.should_retry(&error, attempt) {
                state.settle(AttemptOutcome::TerminalFailure);
                return Err(self.fail(&call, error));
            }

            state.settle(AttemptOutcome::RetryableFailure);
            let delay = self.retry_delay(&call, &error, attempt);
            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt,
                "Retrying request after delay"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One transport exchange, bounded by the call's timeout.
    ///
    /// When the timer wins, the transport future is dropped, which aborts the
    /// in-flight request.
    async fn send_once(&self, call: &PreparedCall) -> Result<TransportResponse> {
        let send = self.transport.send(&call.request);
        match call.timeout {
            Some(timeout) => tokio::time::timeout(timeout, send)
                .await
                .unwrap_or(Err(Error::Timeout { after: timeout })),
            None => send.await,
        }
    }

    fn retry_delay(&self, call: &PreparedCall, error: &Error, attempt: u32) -> Duration {
        if self.rate_limit.enabled {
            if let Some(delay) = error
                .rate_limit_info()
                .and_then(|info| info.delay(self.rate_limit.max_wait))
            {
                tracing::info!(
                    rate_limit_delay_ms = delay.as_millis(),
                    attempt,
                    max_wait_secs = self.rate_limit.max_wait.as_secs(),
                    "Rate limited - waiting before retry"
                );
                return delay;
            }
        }
        call.retry.delay(attempt)
    }

    fn fail(&self, call: &PreparedCall, error: Error) -> Error {
        if call.show_notification {
            self.notifier.error(FAILURE_TITLE, &error.to_string());
        }
        error
    }
}
