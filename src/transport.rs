//! The transport primitive the executor drives.
//!
//! A [`Transport`] performs exactly one HTTP exchange per call to
//! [`Transport::send`]. Retries, timeouts and decoding happen above it.
//! [`ReqwestTransport`] is the default implementation.

use crate::body::RequestBody;
use crate::{Error, Result};
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

/// A fully resolved request, ready to be sent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, query included.
    pub url: Url,
    /// Merged headers.
    pub headers: HeaderMap,
    /// Payload.
    pub body: RequestBody,
}

/// A response whose body has been read completely.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body as text.
    pub body: String,
}

/// Issues one HTTP-shaped exchange.
///
/// Dropping the future returned by `send` is the cancellation signal: the
/// executor drops it when an attempt times out, and implementations must
/// abandon the in-flight operation at that point rather than let it finish in
/// the background.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use steadycall::transport::{Transport, TransportRequest, TransportResponse};
/// use http::{HeaderMap, StatusCode};
///
/// struct AlwaysOk;
///
/// #[async_trait]
/// impl Transport for AlwaysOk {
///     async fn send(&self, _request: &TransportRequest) -> steadycall::Result<TransportResponse> {
///         Ok(TransportResponse {
///             status: StatusCode::OK,
///             headers: HeaderMap::new(),
///             body: "ok".to_string(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and reads the whole response body.
    ///
    /// Non-2xx statuses are returned as responses, not errors. Only failures
    /// that prevent a response from being received are errors.
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse>;
}

/// [`Transport`] backed by a `reqwest::Client`.
///
/// Dropping the send future drops reqwest's in-flight request, which closes
/// the connection.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("failed to build HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Raw {
                bytes,
                content_type,
            } => {
                let builder = match content_type {
                    Some(ct) if !request.headers.contains_key(CONTENT_TYPE) => {
                        builder.header(CONTENT_TYPE, ct.as_str())
                    }
                    _ => builder,
                };
                builder.body(bytes.clone())
            }
            RequestBody::Multipart(payload) => builder.multipart(payload.to_form()?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
