//! Sticky failure slot shared between a cache engine and its runner

use crate::Error;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

/// Holds the first failure captured during one invocation
///
/// Once a failure is recorded it stays recorded: the engine consults
/// [`Diagnostics::has_failed`] before every store and skips the upload,
/// so one broken remote does not slow down every remaining task.
#[derive(Debug, Default)]
pub struct Diagnostics {
    error: OnceLock<Error>,
    reported: AtomicBool,
}

impl Diagnostics {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; returns false if an earlier one was already kept
    pub fn record(&self, err: Error) -> bool {
        self.error.set(err).is_ok()
    }

    /// Whether any failure has been recorded
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.error.get().is_some()
    }

    /// The recorded failure, if any
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.get()
    }

    /// Rendered message of the recorded failure
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.error.get().map(ToString::to_string)
    }

    /// Emit the recorded failure through the log, at most once
    ///
    /// Returns the message whether or not it was emitted by this call.
    pub fn report(&self) -> Option<String> {
        let message = self.message()?;
        if !self.reported.swap(true, Ordering::SeqCst) {
            error!(error = %message, "Remote cache error; results were cached locally only");
        }
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sink() {
        let sink = Diagnostics::new();
        assert!(!sink.has_failed());
        assert!(sink.error().is_none());
        assert_eq!(sink.report(), None);
    }

    #[test]
    fn test_first_failure_is_kept() {
        let sink = Diagnostics::new();
        assert!(sink.record(Error::configuration("first")));
        assert!(!sink.record(Error::configuration("second")));

        assert!(sink.has_failed());
        let message = sink.message().unwrap_or_default();
        assert!(message.contains("first"));
        assert!(!message.contains("second"));
    }

    #[test]
    fn test_report_returns_message_every_time() {
        let sink = Diagnostics::new();
        sink.record(Error::task("upload task aborted"));

        let first = sink.report();
        let second = sink.report();
        assert_eq!(first, second);
        assert!(first.unwrap_or_default().contains("upload task aborted"));
    }
}
