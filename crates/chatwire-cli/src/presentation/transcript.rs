//! Transcript rendering.

use std::io::Write;

use chatwire_core::{Message, Sender};

/// One transcript entry as printed by `show`.
pub fn format_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you".to_string(),
        Sender::Assistant => message
            .model_name
            .clone()
            .unwrap_or_else(|| "assistant".to_string()),
        Sender::System => "system".to_string(),
    };
    let stamp = message.created_at.format("%Y-%m-%d %H:%M");
    let mut out = format!("[{stamp}] {who}{}", version_label(message));
    out.push_str(&format!("  ({})\n", message.uuid));
    out.push_str(&message.content);
    out
}

/// ` v2/3` for regenerated messages, empty otherwise.
pub fn version_label(message: &Message) -> String {
    match (message.current_version_index, message.versions.as_ref()) {
        (Some(index), Some(versions)) if versions.len() > 1 => {
            format!(" v{}/{}", index + 1, versions.len())
        }
        _ => String::new(),
    }
}

/// Prints a growing text incrementally.
///
/// When the text is replaced rather than extended (preview text giving way
/// to the real reply), the line is restarted.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed: String,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// What has to be written to bring the terminal from the printed text
    /// to `text`.
    pub fn delta(&mut self, text: &str) -> Option<String> {
        if text == self.printed {
            return None;
        }
        let out = match text.strip_prefix(self.printed.as_str()) {
            Some(rest) => rest.to_string(),
            None => format!("\n{text}"),
        };
        self.printed = text.to_string();
        Some(out)
    }

    pub fn update(&mut self, text: &str) {
        if let Some(out) = self.delta(text) {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(out.as_bytes());
            let _ = stdout.flush();
        }
    }

    pub fn printed(&self) -> &str {
        &self.printed
    }
}
