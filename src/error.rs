//! Error types for backend calls.
//!
//! Every failure a call can surface is an [`Error`]. Transport-level failures
//! (connection refused, DNS, reset, timeout) carry no status; HTTP-level
//! failures carry the status code, the raw body and, when the body is JSON,
//! its parsed value.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// Boxed source error used by transports that are not backed by `reqwest`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error surfaced to callers once a call reaches a terminal outcome.
///
/// # Examples
///
/// ```no_run
/// use steadycall::{Client, Error, ErrorKind};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.fetch::<serde_json::Value>("/projects").await {
///     Ok(response) => println!("Projects: {:?}", response.data),
///     Err(e) if e.kind() == ErrorKind::Client => {
///         eprintln!("Rejected ({:?}): {:?}", e.status(), e.body());
///     }
///     Err(e) => eprintln!("Call failed: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The call never produced a response: connection failure, DNS failure,
    /// connection reset and similar.
    #[error("transport error: {message}")]
    Transport {
        /// Human readable description of the failure.
        message: String,
        /// The underlying error, when the transport exposes one.
        #[source]
        source: Option<BoxError>,
    },

    /// The attempt did not settle within the configured timeout.
    #[error("request timeout")]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The server answered with a status outside the 2xx range.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code.
        status: StatusCode,
        /// The raw response body.
        raw_response: Box<str>,
        /// The response body parsed as JSON, when it was decodable.
        body: Option<Box<serde_json::Value>>,
        /// The response headers.
        headers: Box<HeaderMap>,
        /// Rate limit hints parsed from the headers.
        rate_limit_info: Option<crate::rate_limit::RateLimitInfo>,
    },

    /// A successful response could not be decoded into the expected type.
    ///
    /// The raw text is preserved so the payload can be inspected.
    #[error("failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize.
        raw_response: String,
        /// The serde error message.
        serde_error: String,
        /// The HTTP status code.
        status: StatusCode,
    },

    /// Invalid client or call configuration: bad header, bad retry policy.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// The request body could not be serialized.
    #[error("failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided or produced by path joining.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was received.
    Transport,
    /// The attempt timed out on the client side.
    Timeout,
    /// 5xx response.
    Server,
    /// 408 or 429: the server asked the client to slow down or try again.
    Throttled,
    /// Any other 4xx response.
    Client,
    /// 1xx or 3xx response reaching the caller.
    UnexpectedStatus,
    /// A success body did not decode.
    Decode,
    /// Configuration, serialization or URL error raised before sending.
    Configuration,
}

impl Error {
    /// Builds a transport error from any error source.
    pub fn transport<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = source.into();
        Error::Transport {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport { .. } => ErrorKind::Transport,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::HttpError { status, .. } => kind_for_status(*status),
            Error::DeserializationFailed { .. } => ErrorKind::Decode,
            Error::ConfigurationError(_)
            | Error::SerializationFailed(_)
            | Error::InvalidUrl(_) => ErrorKind::Configuration,
        }
    }

    /// Returns `true` if the default classification considers this error transient.
    ///
    /// Transport failures, timeouts, 5xx, 408 and 429 are retryable. Every
    /// other failure is terminal.
    ///
    /// # Examples
    ///
    /// ```
    /// use steadycall::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::TOO_MANY_REQUESTS,
    ///     raw_response: "slow down".into(),
    ///     body: None,
    ///     headers: Box::default(),
    ///     rate_limit_info: None,
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::NOT_FOUND,
    ///     raw_response: "missing".into(),
    ///     body: None,
    ///     headers: Box::default(),
    ///     rate_limit_info: None,
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::Timeout | ErrorKind::Server | ErrorKind::Throttled
        )
    }

    /// Returns the HTTP status code if the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the parsed JSON error body, if the server sent one.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Error::HttpError { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns rate limit information if the server sent any.
    pub fn rate_limit_info(&self) -> Option<&crate::rate_limit::RateLimitInfo> {
        match self {
            Error::HttpError {
                rate_limit_info, ..
            } => rate_limit_info.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        // Builder errors (bad URL, unsupported scheme) fail the same way on every attempt.
        if error.is_builder() {
            return Error::ConfigurationError(format!("invalid request: {}", error));
        }
        Error::transport(error)
    }
}

fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status.as_u16() {
        408 | 429 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Server,
        400..=499 => ErrorKind::Client,
        _ => ErrorKind::UnexpectedStatus,
    }
}

/// A specialized `Result` type for backend calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(status: u16) -> Error {
        Error::HttpError {
            status: StatusCode::from_u16(status).unwrap(),
            raw_response: "".into(),
            body: None,
            headers: Box::default(),
            rate_limit_info: None,
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(http_error(503).kind(), ErrorKind::Server);
        assert_eq!(http_error(408).kind(), ErrorKind::Throttled);
        assert_eq!(http_error(429).kind(), ErrorKind::Throttled);
        assert_eq!(http_error(404).kind(), ErrorKind::Client);
        assert_eq!(http_error(302).kind(), ErrorKind::UnexpectedStatus);
    }

    #[test]
    fn test_default_retryability() {
        for status in [500, 502, 503, 504, 408, 429] {
            assert!(http_error(status).is_retryable(), "{status} should retry");
        }
        for status in [400, 401, 403, 404, 409, 422, 301] {
            assert!(!http_error(status).is_retryable(), "{status} should not retry");
        }

        assert!(Error::Timeout {
            after: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(Error::transport("connection reset").is_retryable());
        assert!(!Error::ConfigurationError("bad".into()).is_retryable());
    }

    #[test]
    fn test_reqwest_builder_error_is_configuration() {
        let source = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        assert!(source.is_builder());

        let err = Error::from(source);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timeout_has_no_status() {
        let err = Error::Timeout {
            after: Duration::from_millis(2000),
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "request timeout");
    }
}
