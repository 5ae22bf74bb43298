//! Terminal error sink.

use chatwire_core::ErrorNotifier;

/// Prints error reports to stderr.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl ErrorNotifier for TerminalNotifier {
    fn report_error(&self, title: &str, message: &str) {
        tracing::debug!(%title, %message, "error reported");
        eprintln!("\n{title}: {message}");
    }
}
