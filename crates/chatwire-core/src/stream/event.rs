//! Typed events of the generation stream protocol.
//!
//! Every `data:` line carries one JSON object whose `type` field selects the
//! event. Payload fields are loosely shaped on the wire (`message` is a
//! full `Message` on success events and a plain string on failures), so
//! lines are first read into a permissive raw form and then narrowed.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::domain::Message;

/// Discriminant of a stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    InitialMetadata,
    Metadata,
    ModelSelection,
    InitialContent,
    Content,
    Completion,
    Error,
    Unethical,
}

impl EventType {
    /// Whether this event ends the stream.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completion | Self::Error | Self::Unethical)
    }
}

/// Model assignment and attribution metadata reported during a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<serde_json::Value>,
}

impl StreamMetadata {
    pub const fn is_empty(&self) -> bool {
        self.selected_model.is_none()
            && self.selected_provider.is_none()
            && self.query_category.is_none()
            && self.rank.is_none()
    }

    /// Overwrite fields that `other` carries; keep the rest.
    pub fn merge(&mut self, other: &Self) {
        if other.selected_model.is_some() {
            self.selected_model.clone_from(&other.selected_model);
        }
        if other.selected_provider.is_some() {
            self.selected_provider.clone_from(&other.selected_provider);
        }
        if other.query_category.is_some() {
            self.query_category.clone_from(&other.query_category);
        }
        if other.rank.is_some() {
            self.rank.clone_from(&other.rank);
        }
    }
}

/// One decoded event of the generation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Early metadata, possibly with the server-confirmed user message.
    InitialMetadata {
        message: Option<Message>,
        metadata: StreamMetadata,
    },
    Metadata(StreamMetadata),
    ModelSelection(StreamMetadata),
    /// Preview text shown until real content starts.
    InitialContent { chunk: String },
    Content { chunk: String },
    /// Terminal success; `message` is absent for suppressed replies.
    Completion {
        message: Option<Message>,
        metadata: StreamMetadata,
    },
    Error { message: String },
    Unethical { message: String },
}

const DEFAULT_ERROR_TEXT: &str = "The response could not be generated";
const DEFAULT_UNETHICAL_TEXT: &str = "This request violates the content policy";

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: EventType,
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    metadata: StreamMetadata,
}

impl StreamEvent {
    /// Parse the JSON payload of one `data:` line.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_str(payload)?;
        let event = match raw.kind {
            EventType::InitialMetadata => Self::InitialMetadata {
                message: persisted_message(raw.message)?,
                metadata: raw.metadata,
            },
            EventType::Metadata => Self::Metadata(raw.metadata),
            EventType::ModelSelection => Self::ModelSelection(raw.metadata),
            EventType::InitialContent => Self::InitialContent {
                chunk: raw.chunk.unwrap_or_default(),
            },
            EventType::Content => Self::Content {
                chunk: raw.chunk.unwrap_or_default(),
            },
            EventType::Completion => Self::Completion {
                message: persisted_message(raw.message)?,
                metadata: raw.metadata,
            },
            EventType::Error => Self::Error {
                message: failure_text(raw.error, raw.message, DEFAULT_ERROR_TEXT),
            },
            EventType::Unethical => Self::Unethical {
                message: failure_text(raw.error, raw.message, DEFAULT_UNETHICAL_TEXT),
            },
        };
        Ok(event)
    }

    pub const fn event_type(&self) -> EventType {
        match self {
            Self::InitialMetadata { .. } => EventType::InitialMetadata,
            Self::Metadata(_) => EventType::Metadata,
            Self::ModelSelection(_) => EventType::ModelSelection,
            Self::InitialContent { .. } => EventType::InitialContent,
            Self::Content { .. } => EventType::Content,
            Self::Completion { .. } => EventType::Completion,
            Self::Error { .. } => EventType::Error,
            Self::Unethical { .. } => EventType::Unethical,
        }
    }

    /// Incremental text carried by this event (empty for non-text events).
    pub fn delta(&self) -> &str {
        match self {
            Self::InitialContent { chunk } | Self::Content { chunk } => chunk,
            _ => "",
        }
    }

    /// Metadata carried by this event, if any.
    pub const fn metadata(&self) -> Option<&StreamMetadata> {
        match self {
            Self::InitialMetadata { metadata, .. }
            | Self::Metadata(metadata)
            | Self::ModelSelection(metadata)
            | Self::Completion { metadata, .. } => Some(metadata),
            _ => None,
        }
    }
}

fn persisted_message(value: Option<serde_json::Value>) -> Result<Option<Message>, serde_json::Error> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value).map(Some),
        Some(other) => Err(serde_json::Error::custom(format!(
            "expected message object, got {other}"
        ))),
    }
}

fn failure_text(
    error: Option<String>,
    message: Option<serde_json::Value>,
    fallback: &str,
) -> String {
    error
        .filter(|e| !e.is_empty())
        .or_else(|| match message {
            Some(serde_json::Value::String(text)) if !text.is_empty() => Some(text),
            _ => None,
        })
        .unwrap_or_else(|| fallback.to_string())
}
