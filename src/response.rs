//! The success value of a call.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A decoded successful response together with how it was obtained.
///
/// The payload is `data`; nothing else is wrapped around it. `Response`
/// derefs to `T`, so most call sites can treat it as the value itself.
///
/// # Examples
///
/// ```no_run
/// use steadycall::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Project {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), steadycall::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let project = client.fetch::<Project>("/projects/7").await?;
/// println!("{} ({} attempts, {:?})", project.name, project.attempts, project.latency);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded payload.
    pub data: T,
    /// The raw response body.
    pub raw_body: String,
    /// HTTP status of the successful attempt.
    pub status: StatusCode,
    /// Headers of the successful attempt.
    pub headers: HeaderMap,
    /// Time from the first attempt's start until decoding finished,
    /// backoff included.
    pub latency: Duration,
    /// Attempts made, `1` when the first one succeeded.
    pub attempts: u32,
}

impl<T> Response<T> {
    /// Consumes the response and returns the payload.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Maps the payload, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use steadycall::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response {
    ///     data: 42,
    ///     raw_body: "42".to_string(),
    ///     status: StatusCode::OK,
    ///     headers: HeaderMap::new(),
    ///     latency: Duration::from_millis(12),
    ///     attempts: 1,
    /// };
    ///
    /// assert_eq!(response.map(|n| n * 2).data, 84);
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if earlier attempts failed before this one succeeded.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
