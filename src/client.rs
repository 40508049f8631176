//! The client facade.
//!
//! [`Client`] holds long-lived defaults (base URL, headers, bearer token,
//! timeout, retry policy) and exposes one entry point per verb. Use
//! [`ClientBuilder`] to configure and create clients.

use crate::body::{MultipartPayload, RequestBody};
use crate::config::{parse_header, CallConfig, Defaults};
use crate::executor::RequestExecutor;
use crate::notify::{Notifier, TracingNotifier};
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryPolicy;
use crate::settings::ClientSettings;
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, Response, Result};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

/// A client for calling backend endpoints with retries, timeouts and decoding.
///
/// Cloning is cheap and clones share defaults: a mutator called through one
/// clone affects calls made through all of them.
///
/// Every call takes a snapshot of the defaults when it starts. Mutators
/// replace the snapshot as a whole, so a call never sees half of an update,
/// but calls already in flight keep the values they started with.
///
/// # Examples
///
/// ```no_run
/// use steadycall::{Client, RetryPolicy};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct NewProject {
///     name: String,
/// }
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
///     .timeout(Duration::from_secs(10))
///     .retry_policy(RetryPolicy::new(3, Duration::from_millis(500), Duration::from_secs(10)))
///     .build()?;
///
/// client.set_auth_token("secret-token")?;
///
/// let created: steadycall::Response<Project> = client
///     .create("/projects", &NewProject { name: "atlas".to_string() })
///     .await?;
/// let project = client.fetch::<Project>(format!("/projects/{}", created.id)).await?;
/// println!("Fetched {}", project.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    executor: RequestExecutor,
    defaults: RwLock<Arc<Defaults>>,
}

impl Client {
    /// Creates a new `ClientBuilder`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Makes a call using `config.method`.
    ///
    /// This is the general entry point; the verb methods delegate to it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use steadycall::{CallConfig, Client};
    /// use http::Method;
    ///
    /// # async fn example() -> Result<(), steadycall::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let config = CallConfig::new()
    ///     .with_method(Method::GET)
    ///     .with_query_param("status", "active");
    /// let projects = client.call::<serde_json::Value>("projects", config).await?;
    /// println!("{}", projects.data);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<T>(&self, path: impl AsRef<str>, config: CallConfig) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let call = self.snapshot().prepare(path.as_ref(), config)?;
        self.inner.executor.execute(call).await
    }

    /// GET `path`.
    pub async fn fetch<T>(&self, path: impl AsRef<str>) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch_with(path, CallConfig::new()).await
    }

    /// GET `path` with per-call options.
    pub async fn fetch_with<T>(&self, path: impl AsRef<str>, config: CallConfig) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(path, config.with_method(Method::GET)).await
    }

    /// POST `body` as JSON to `path`.
    pub async fn create<B, T>(&self, path: impl AsRef<str>, body: &B) -> Result<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.create_with(path, CallConfig::new().with_json(body)?)
            .await
    }

    /// POST to `path`; the body, if any, comes from `config`.
    pub async fn create_with<T>(&self, path: impl AsRef<str>, config: CallConfig) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(path, config.with_method(Method::POST)).await
    }

    /// PUT `body` as JSON to `path`.
    pub async fn replace<B, T>(&self, path: impl AsRef<str>, body: &B) -> Result<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.replace_with(path, CallConfig::new().with_json(body)?)
            .await
    }

    /// PUT to `path`; the body, if any, comes from `config`.
    pub async fn replace_with<T>(&self, path: impl AsRef<str>, config: CallConfig) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(path, config.with_method(Method::PUT)).await
    }

    /// PATCH `body` as JSON to `path`.
    pub async fn patch<B, T>(&self, path: impl AsRef<str>, body: &B) -> Result<Response<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.patch_with(path, CallConfig::new().with_json(body)?)
            .await
    }

    /// PATCH `path`; the body, if any, comes from `config`.
    pub async fn patch_with<T>(&self, path: impl AsRef<str>, config: CallConfig) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(path, config.with_method(Method::PATCH)).await
    }

    /// DELETE `path`.
    pub async fn remove<T>(&self, path: impl AsRef<str>) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.remove_with(path, CallConfig::new()).await
    }

    /// DELETE `path` with per-call options.
    pub async fn remove_with<T>(&self, path: impl AsRef<str>, config: CallConfig) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.call(path, config.with_method(Method::DELETE)).await
    }

    /// POST a multipart form to `path`.
    ///
    /// The default content-type header is not sent, and a content-type set
    /// on the call is dropped, so the transport can declare the multipart
    /// boundary.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use steadycall::{Client, MultipartPayload};
    ///
    /// # async fn example() -> Result<(), steadycall::Error> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let form = MultipartPayload::new()
    ///     .file("file", "avatar.png", std::fs::read("avatar.png").unwrap(), "image/png");
    /// let stored = client.upload::<serde_json::Value>("/uploads", form).await?;
    /// println!("{}", stored.data);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn upload<T>(&self, path: impl AsRef<str>, payload: MultipartPayload) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.upload_with(path, payload, CallConfig::new()).await
    }

    /// POST a multipart form to `path` with per-call options.
    pub async fn upload_with<T>(
        &self,
        path: impl AsRef<str>,
        payload: MultipartPayload,
        config: CallConfig,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let config = config
            .with_method(Method::POST)
            .with_body(RequestBody::Multipart(payload));
        self.call(path, config).await
    }

    /// Sends `Authorization: Bearer <token>` on subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value.
    pub fn set_auth_token(&self, token: impl AsRef<str>) -> Result<()> {
        let mut value = HeaderValue::try_from(format!("Bearer {}", token.as_ref()))
            .map_err(|e| Error::ConfigurationError(format!("invalid auth token: {}", e)))?;
        value.set_sensitive(true);
        self.update_defaults(|d| {
            d.headers.insert(AUTHORIZATION, value);
        });
        Ok(())
    }

    /// Stops sending the bearer token.
    pub fn remove_auth_token(&self) {
        self.update_defaults(|d| {
            d.headers.remove(AUTHORIZATION);
        });
    }

    /// Points subsequent calls at a new base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn set_base_url(&self, url: impl AsRef<str>) -> Result<()> {
        let url = Url::parse(url.as_ref())?;
        self.update_defaults(|d| d.base_url = url);
        Ok(())
    }

    /// Sets a default header, replacing any previous value for `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn set_header(&self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<()> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.update_defaults(|d| {
            d.headers.insert(name, value);
        });
        Ok(())
    }

    /// Removes a default header. Unknown or invalid names are ignored.
    pub fn remove_header(&self, name: impl AsRef<str>) {
        let name = name.as_ref();
        self.update_defaults(|d| {
            d.headers.remove(name);
        });
    }

    /// Returns the current base URL.
    pub fn base_url(&self) -> Url {
        self.snapshot().base_url.clone()
    }

    /// Returns a copy of the current default headers.
    pub fn default_headers(&self) -> HeaderMap {
        self.snapshot().headers.clone()
    }

    fn snapshot(&self) -> Arc<Defaults> {
        let guard = self
            .inner
            .defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Builds a new snapshot from the current one and swaps it in.
    fn update_defaults(&self, update: impl FnOnce(&mut Defaults)) {
        let mut guard = self
            .inner
            .defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = Defaults::clone(&guard);
        update(&mut next);
        *guard = Arc::new(next);
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use steadycall::{ClientBuilder, RetryPolicy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), steadycall::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com/v1")?
///     .timeout(Duration::from_secs(30))
///     .retry_policy(RetryPolicy::default())
///     .default_header("User-Agent", "dashboard/2.3")?
///     .notify_on_failure(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    timeout: Option<Duration>,
    notify_on_failure: bool,
    rate_limit_config: RateLimitConfig,
    transport: Option<Arc<dyn Transport>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl ClientBuilder {
    /// Creates a builder with JSON content-type and accept headers, the
    /// default retry policy and no timeout.
    pub fn new() -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            base_url: None,
            default_headers,
            retry_policy: RetryPolicy::default(),
            timeout: None,
            notify_on_failure: false,
            rate_limit_config: RateLimitConfig::default(),
            transport: None,
            notifier: None,
        }
    }

    /// Creates a builder from a settings document.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or a header is invalid.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let mut builder = Self::new()
            .base_url(&settings.base_url)?
            .retry_policy(settings.retry.to_policy())
            .notify_on_failure(settings.notify_on_failure)
            .rate_limit_config(settings.rate_limit.to_config());

        if let Some(timeout_ms) = settings.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        for (name, value) in &settings.headers {
            builder = builder.default_header(name, value)?;
        }
        Ok(builder)
    }

    /// Sets the base URL for all calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the default per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets whether terminal failures notify the user by default.
    pub fn notify_on_failure(mut self, notify: bool) -> Self {
        self.notify_on_failure = notify;
        self
    }

    /// Sets rate limit handling.
    pub fn rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Replaces the transport. Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the notification sink. Defaults to [`TracingNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided, the retry policy is
    /// invalid or the default transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("base URL is required".to_string()))?;
        self.retry_policy.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };
        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(TracingNotifier),
        };

        let defaults = Defaults {
            base_url,
            headers: self.default_headers,
            timeout: self.timeout,
            retry: self.retry_policy,
            show_notification: self.notify_on_failure,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                executor: RequestExecutor::new(transport, notifier, self.rate_limit_config),
                defaults: RwLock::new(Arc::new(defaults)),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::builder()
            .base_url("https://api.example.com")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_base_url() {
        assert!(matches!(
            Client::builder().build(),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_build_rejects_invalid_policy() {
        let result = Client::builder()
            .base_url("https://api.example.com")
            .unwrap()
            .retry_policy(RetryPolicy::new(1, Duration::from_secs(5), Duration::from_secs(1)))
            .build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_default_headers() {
        let headers = client().default_headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_set_header_last_write_wins() {
        let client = client();
        client.set_header("X-Tenant", "a").unwrap();
        client.set_header("X-Tenant", "b").unwrap();

        let headers = client.default_headers();
        let values: Vec<_> = headers.get_all("x-tenant").iter().collect();
        assert_eq!(values, vec!["b"]);

        client.remove_header("x-tenant");
        assert!(client.default_headers().get("x-tenant").is_none());
    }

    #[test]
    fn test_auth_token_round_trip() {
        let client = client();
        client.set_auth_token("t0k3n").unwrap();
        assert_eq!(client.default_headers()[AUTHORIZATION], "Bearer t0k3n");
        assert!(client.default_headers()[AUTHORIZATION].is_sensitive());

        client.remove_auth_token();
        assert!(client.default_headers().get(AUTHORIZATION).is_none());

        assert!(client.set_auth_token("bad\ntoken").is_err());
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_mutation() {
        let client = client();
        let before = client.snapshot();
        client.set_base_url("https://other.example.com").unwrap();

        assert_eq!(before.base_url.as_str(), "https://api.example.com/");
        assert_eq!(client.base_url().as_str(), "https://other.example.com/");
    }

    #[test]
    fn test_clones_share_defaults() {
        let client = client();
        let clone = client.clone();
        clone.set_header("x-shared", "yes").unwrap();
        assert_eq!(client.default_headers()["x-shared"], "yes");
    }

    #[test]
    fn test_set_base_url_rejects_invalid() {
        assert!(matches!(
            client().set_base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
