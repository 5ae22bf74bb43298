//! Terminal output helpers.

mod tables;
mod transcript;

pub use tables::{print_separator, truncate_string};
pub use transcript::{StreamPrinter, format_message, version_label};
