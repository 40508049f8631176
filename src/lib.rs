//! # steadycall - resilient calls to your own backend
//!
//! steadycall issues outbound API calls with automatic retries (exponential
//! backoff with jitter), per-attempt timeouts, content-negotiated decoding
//! and a pluggable failure classification. It is built on `reqwest` and
//! `tokio`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use steadycall::{CallConfig, Client, RetryPolicy};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct NewInvoice {
//!     customer_id: u64,
//!     amount_cents: u64,
//! }
//!
//! #[derive(Deserialize)]
//! struct Invoice {
//!     id: u64,
//!     status: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), steadycall::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(10))
//!         .retry_policy(RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(30)))
//!         .build()?;
//!
//!     client.set_auth_token("secret-token")?;
//!
//!     let invoice: steadycall::Response<Invoice> = client
//!         .create("/invoices", &NewInvoice { customer_id: 7, amount_cents: 1999 })
//!         .await?;
//!     println!("Invoice {} is {}", invoice.id, invoice.status);
//!
//!     // Fail fast and tell the user if the lookup fails.
//!     let config = CallConfig::new()
//!         .with_timeout(Duration::from_secs(2))
//!         .with_retry(RetryPolicy::none())
//!         .with_notification(true);
//!     let latest = client.fetch_with::<Invoice>("invoices/latest", config).await?;
//!     println!("Latest invoice: {}", latest.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retries
//!
//! A call makes at most `max_retries + 1` attempts. By default transport
//! failures, timeouts, 5xx, 408 and 429 are retried; other statuses fail
//! immediately. Swap the rule per client or per call with a
//! [`RetryClassifier`]:
//!
//! ```no_run
//! use steadycall::{CallConfig, RetryClassifier, RetryOverride};
//! use http::StatusCode;
//!
//! // This endpoint is idempotent, so a conflict is worth retrying.
//! let config = CallConfig::new().with_retry(
//!     RetryOverride::new().classifier(RetryClassifier::Statuses(vec![StatusCode::CONFLICT])),
//! );
//! ```
//!
//! ## Errors
//!
//! Intermediate failures are absorbed; the caller sees either the decoded
//! value or the last [`Error`]. Use [`Error::kind`], [`Error::status`] and
//! [`Error::body`] to inspect it.

pub mod backoff;
mod body;
mod client;
mod config;
pub mod decode;
mod error;
mod executor;
pub mod notify;
pub mod rate_limit;
mod response;
pub mod retry;
pub mod settings;
pub mod transport;

pub use body::{MultipartPart, MultipartPayload, RequestBody};
pub use client::{Client, ClientBuilder};
pub use config::CallConfig;
pub use error::{BoxError, Error, ErrorKind, Result};
pub use notify::{Notifier, TracingNotifier};
pub use response::Response;
pub use retry::{RetryClassifier, RetryOverride, RetryPolicy, RetryPredicate};
pub use transport::{ReqwestTransport, Transport};
