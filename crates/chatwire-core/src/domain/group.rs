//! Wire-level message grouping.
//!
//! The backend pages messages as groups rather than a flat list. A `multi`
//! group is a regenerate lineage: every message in it competes for the same
//! transcript slot, identified by `parent_message_uuid`.

use serde::{Deserialize, Serialize};

use super::chat::Message;

/// Kind of a message group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Single,
    Multi,
}

/// One pagination unit of a conversation's messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    #[serde(rename = "type")]
    pub kind: GroupKind,
    #[serde(default)]
    pub parent_message_uuid: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl MessageGroup {
    /// A group holding exactly one message.
    pub fn single(message: Message) -> Self {
        Self {
            kind: GroupKind::Single,
            parent_message_uuid: None,
            messages: vec![message],
        }
    }

    /// A regenerate lineage attached to `parent`.
    pub fn multi(parent: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            kind: GroupKind::Multi,
            parent_message_uuid: Some(parent.into()),
            messages,
        }
    }
}
