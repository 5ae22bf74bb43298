//! Chat domain types.
//!
//! These types represent conversations and messages in the domain model,
//! independent of any transport concerns. Field names follow the backend's
//! wire format so the same types deserialize straight off the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of client-generated message ids.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// A chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Project the conversation belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    /// Model the conversation was started with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    #[serde(alias = "human")]
    User,
    #[serde(alias = "ai", alias = "bot")]
    Assistant,
    System,
}

impl Sender {
    /// Parse a sender from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" | "human" => Some(Self::User),
            "assistant" | "ai" | "bot" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Convert sender to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to an uploaded file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedFile {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// One transcript entry.
///
/// When a message has been regenerated it carries its whole lineage in
/// `versions`; `content` and `model_name` always mirror
/// `versions[current_version_index]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub uuid: String,
    #[serde(default)]
    pub content: String,
    pub sender: Sender,
    /// Set for assistant messages, `None` for user input.
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_files: Option<Vec<LinkedFile>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<Message>>,
    #[serde(
        default,
        rename = "currentVersionIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_version_index: Option<usize>,
}

impl Message {
    /// Build the optimistic user message shown while a send is in flight.
    pub fn user_placeholder(content: impl Into<String>, file_uuids: &[String]) -> Self {
        let now = Utc::now();
        let linked_files = (!file_uuids.is_empty()).then(|| {
            file_uuids
                .iter()
                .map(|uuid| LinkedFile {
                    uuid: uuid.clone(),
                    file_name: None,
                })
                .collect()
        });

        Self {
            uuid: format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4()),
            content: content.into(),
            sender: Sender::User,
            model_name: None,
            linked_files,
            created_at: now,
            updated_at: now,
            versions: None,
            current_version_index: None,
        }
    }

    /// Whether this message only exists client-side.
    pub fn is_placeholder(&self) -> bool {
        self.uuid.starts_with(LOCAL_ID_PREFIX)
    }

    /// Whether this message carries a version lineage.
    pub const fn is_versioned(&self) -> bool {
        self.versions.is_some()
    }

    /// Number of versions (1 for an unversioned message).
    pub fn version_count(&self) -> usize {
        self.versions.as_ref().map_or(1, Vec::len)
    }

    /// The version currently shown, if versioned.
    pub fn current_version(&self) -> Option<&Self> {
        let index = self.current_version_index?;
        self.versions.as_ref()?.get(index)
    }

    /// Copy of this message suitable for storing inside a lineage.
    #[must_use]
    pub fn as_version(&self) -> Self {
        Self {
            versions: None,
            current_version_index: None,
            ..self.clone()
        }
    }

    /// Turn an unversioned message into a lineage holding itself at index 0.
    pub fn ensure_versioned(&mut self) {
        if self.versions.is_none() {
            self.versions = Some(vec![self.as_version()]);
            self.current_version_index = Some(0);
        }
    }

    /// Append a version and make it the current one.
    pub fn push_version(&mut self, version: &Self) {
        self.ensure_versioned();
        if let Some(versions) = self.versions.as_mut() {
            versions.push(version.as_version());
            self.current_version_index = Some(versions.len() - 1);
        }
        self.mirror_current();
    }

    /// Point at another version. Returns `false` when `index` is out of range.
    pub fn switch_version(&mut self, index: usize) -> bool {
        let in_range = self.versions.as_ref().is_some_and(|v| index < v.len());
        if in_range {
            self.current_version_index = Some(index);
            self.mirror_current();
        }
        in_range
    }

    /// Refresh `content`/`model_name` from the current version.
    pub fn mirror_current(&mut self) {
        if let Some(current) = self.current_version() {
            let content = current.content.clone();
            let model_name = current.model_name.clone();
            self.content = content;
            self.model_name = model_name;
        }
    }

    /// Check the lineage invariants: non-empty, index in range, fields mirrored,
    /// and no nested lineages.
    pub fn versions_consistent(&self) -> bool {
        match (&self.versions, self.current_version_index) {
            (None, None) => true,
            (Some(versions), Some(index)) => {
                index < versions.len()
                    && versions.iter().all(|v| v.versions.is_none())
                    && versions[index].content == self.content
                    && versions[index].model_name == self.model_name
            }
            _ => false,
        }
    }
}

/// Data for creating a new conversation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewConversation {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// Filters applied to a conversation list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationFilters {
    pub project_uuid: Option<String>,
    pub search: Option<String>,
}
