//! User-visible failure notifications.

/// Title used for terminal-failure notifications.
pub const FAILURE_TITLE: &str = "Request failed";

/// Sink for user-visible error notifications (a toast, a status line, ...).
///
/// Called at most once per call, and only when the call fails terminally with
/// notifications enabled. Retried failures never reach the sink.
pub trait Notifier: Send + Sync {
    /// Shows an error with a short description.
    fn error(&self, title: &str, description: &str);
}

/// Notifier that writes to the `tracing` error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, title: &str, description: &str) {
        tracing::error!(title, description, "Notification");
    }
}
