//! Per-call configuration and its merge with client defaults.

use crate::body::RequestBody;
use crate::retry::{RetryOverride, RetryPolicy};
use crate::transport::TransportRequest;
use crate::{Error, Result};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Options for a single call. Every field is optional; unset fields take the
/// client's defaults.
///
/// # Examples
///
/// ```
/// use steadycall::{CallConfig, RetryOverride};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), steadycall::Error> {
/// let config = CallConfig::new()
///     .with_header("X-Request-Id", "b7f2")?
///     .with_query_param("page", "2")
///     .with_timeout(Duration::from_secs(2))
///     .with_retry(RetryOverride::new().max_retries(0))
///     .with_notification(true);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallConfig {
    /// HTTP method. Verb entry points set this themselves.
    pub method: Method,
    /// Headers added on top of the client's default headers.
    pub headers: HeaderMap,
    /// Query parameters appended to the URL, in order.
    pub query_params: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
    /// Retry policy fields to override.
    pub retry: RetryOverride,
    /// Whether a terminal failure notifies the user.
    pub show_notification: Option<bool>,
}

impl CallConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends a query parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `body` cannot be serialized.
    pub fn with_json<B>(mut self, body: &B) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        self.body = RequestBody::json(body)?;
        Ok(self)
    }

    /// Sets any body, including raw payloads.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides retry policy fields.
    pub fn with_retry(mut self, retry: impl Into<RetryOverride>) -> Self {
        self.retry = retry.into();
        self
    }

    /// Enables or disables the failure notification.
    pub fn with_notification(mut self, show: bool) -> Self {
        self.show_notification = Some(show);
        self
    }
}

/// Client-wide defaults. Immutable once shared; mutators on the client
/// replace the whole snapshot.
#[derive(Debug, Clone)]
pub(crate) struct Defaults {
    pub(crate) base_url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) timeout: Option<Duration>,
    pub(crate) retry: RetryPolicy,
    pub(crate) show_notification: bool,
}

/// A call with all defaults applied. Owned by one call and never mutated.
#[derive(Debug, Clone)]
pub(crate) struct PreparedCall {
    pub(crate) request: TransportRequest,
    pub(crate) timeout: Option<Duration>,
    pub(crate) retry: RetryPolicy,
    pub(crate) show_notification: bool,
}

impl Defaults {
    /// Merges `config` over these defaults.
    pub(crate) fn prepare(&self, path: &str, config: CallConfig) -> Result<PreparedCall> {
        let retry = config.retry.apply(&self.retry);
        retry.validate()?;

        let mut url = join_path(&self.base_url, path)?;
        if !config.query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(&config.query_params);
        }

        let mut headers = self.headers.clone();
        for name in config.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &config.headers {
            headers.append(name.clone(), value.clone());
        }

        match &config.body {
            // The transport writes the boundary.
            RequestBody::Multipart(_) => {
                headers.remove(CONTENT_TYPE);
            }
            RequestBody::Raw {
                content_type: Some(content_type),
                ..
            } if !config.headers.contains_key(CONTENT_TYPE) => {
                let value = HeaderValue::try_from(content_type.as_str()).map_err(|e| {
                    Error::ConfigurationError(format!("invalid body content-type: {}", e))
                })?;
                headers.insert(CONTENT_TYPE, value);
            }
            _ => {}
        }

        Ok(PreparedCall {
            request: TransportRequest {
                method: config.method,
                url,
                headers,
                body: config.body,
            },
            timeout: config.timeout.or(self.timeout),
            retry,
            show_notification: config.show_notification.unwrap_or(self.show_notification),
        })
    }
}

/// Joins a call path onto the base URL, keeping the base URL's own path.
///
/// A leading `/` on `path` is optional. A query on the base URL is kept and a
/// query on `path` is appended after it. The base fragment is dropped.
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url> {
    if base.cannot_be_a_base() {
        return Err(Error::ConfigurationError(format!(
            "base URL {base} cannot have a path"
        )));
    }

    let (path, fragment) = match path.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (path, None),
    };
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };

    let mut url = base.clone();
    url.set_path(&format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    ));
    url.set_fragment(fragment);

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let merged = match base.query().filter(|q| !q.is_empty()) {
            Some(base_query) => format!("{base_query}&{query}"),
            None => query.to_string(),
        };
        url.set_query(Some(&merged));
    }

    Ok(url)
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::ConfigurationError(format!("invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("invalid header value: {}", e)))?;
    Ok((name, value))
}
