//! Choosing which failures are retried.
//!
//! Run with: `cargo run --example custom_retry`

use http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use steadycall::retry::{AndPredicate, OrPredicate, RetryOn5xx, RetryOnTimeout};
use steadycall::{
    CallConfig, Client, Error, Notifier, RetryClassifier, RetryOverride, RetryPolicy,
    RetryPredicate,
};

/// Only retry the first `N` attempts, whatever the failure.
struct FirstAttempts(u32);

impl RetryPredicate for FirstAttempts {
    fn should_retry(&self, _error: &Error, attempt: u32) -> bool {
        attempt <= self.0
    }
}

/// Retry when the error body says the server is busy.
struct RetryOnBusyMessage;

impl RetryPredicate for RetryOnBusyMessage {
    fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
        error
            .raw_response()
            .is_some_and(|body| body.contains("try again later"))
    }
}

/// Prints notifications to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, title: &str, description: &str) {
        eprintln!("[{title}] {description}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("steadycall=info,custom_retry=info")
        .init();

    let client = Client::builder()
        .base_url("https://httpbin.org")?
        .retry_policy(RetryPolicy::new(3, Duration::from_millis(200), Duration::from_secs(5)))
        .notifier(Arc::new(StderrNotifier))
        .notify_on_failure(true)
        .build()?;

    println!("=== default classifier: 503 is retried ===");
    match client.fetch::<String>("/status/503").await {
        Ok(response) => println!("success after {} attempts", response.attempts),
        Err(e) => println!("failed: {} (kind {:?})", e, e.kind()),
    }
    println!();

    println!("=== extra status: 409 is retried for this call only ===");
    let config = CallConfig::new().with_retry(
        RetryOverride::new().classifier(RetryClassifier::Statuses(vec![StatusCode::CONFLICT])),
    );
    match client.replace_with::<String>("/status/409", config).await {
        Ok(response) => println!("success after {} attempts", response.attempts),
        Err(e) => println!("failed: {}", e),
    }
    println!();

    println!("=== custom predicate: (5xx OR timeout) AND first 2 attempts ===");
    let predicate = AndPredicate::new(vec![
        Box::new(OrPredicate::new(vec![
            Box::new(RetryOn5xx),
            Box::new(RetryOnTimeout),
        ])),
        Box::new(FirstAttempts(2)),
    ]);
    let config = CallConfig::new()
        .with_timeout(Duration::from_secs(1))
        .with_retry(RetryOverride::new().classifier(RetryClassifier::custom(predicate)));
    match client.fetch_with::<String>("/delay/3", config).await {
        Ok(response) => println!("success after {} attempts", response.attempts),
        Err(e) => println!("failed: {}", e),
    }
    println!();

    println!("=== custom predicate: busy message ===");
    let config = CallConfig::new()
        .with_retry(RetryOverride::new().classifier(RetryClassifier::custom(RetryOnBusyMessage)))
        .with_notification(false);
    match client.fetch_with::<String>("/status/429", config).await {
        Ok(response) => println!("success after {} attempts", response.attempts),
        Err(e) => println!("failed quietly: {}", e),
    }

    Ok(())
}
