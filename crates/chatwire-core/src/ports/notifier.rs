//! One-way error notification sink.

/// Receives user-facing error reports.
///
/// Implementations must not block; the session path calls this inline.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorNotifier: Send + Sync {
    /// Report an error with a short title and a human-readable message.
    fn report_error(&self, title: &str, message: &str);
}

/// A notifier that discards every report.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl NoopNotifier {
    pub const fn new() -> Self {
        Self
    }
}

impl ErrorNotifier for NoopNotifier {
    fn report_error(&self, _title: &str, _message: &str) {}
}
