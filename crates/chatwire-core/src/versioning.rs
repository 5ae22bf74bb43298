//! Flattening of paginated message groups into a version-aware transcript.
//!
//! A `multi` group is a regenerate lineage: every message in it is an
//! alternative for one logical transcript slot. The slot is anchored at the
//! group's parent message; when the parent is not part of the output (it
//! sits on another page), a slot is synthesized under the parent's uuid.
//! That fallback is lossy: the parent's own content is not available and
//! the first group message stands in for it.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{GroupKind, Message, MessageGroup};

/// Flatten groups into an ordered message list.
///
/// Output order follows first appearance. Messages are never sorted by
/// timestamp.
///
/// A `multi` group may repeat its parent message. That entry is skipped when
/// appending versions, so the parent is never recorded as a version of
/// itself.
pub fn flatten_groups(groups: &[MessageGroup]) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for group in groups {
        match group.kind {
            GroupKind::Single => {
                for message in &group.messages {
                    index.entry(message.uuid.clone()).or_insert(out.len());
                    out.push(message.clone());
                }
            }
            GroupKind::Multi => {
                let Some(first) = group.messages.first() else {
                    continue;
                };
                let anchor = group
                    .parent_message_uuid
                    .clone()
                    .unwrap_or_else(|| first.uuid.clone());

                if let Some(&position) = index.get(&anchor) {
                    let parent = &mut out[position];
                    for version in group.messages.iter().filter(|m| m.uuid != anchor) {
                        parent.push_version(version);
                    }
                } else {
                    debug!(parent = %anchor, "Synthesizing lineage for missing parent");
                    index.insert(anchor.clone(), out.len());
                    out.push(synthesize(anchor, &group.messages));
                }
            }
        }
    }

    out
}

/// Build a canonical entry keyed by `anchor` holding every message as a
/// version, with the latest current.
fn synthesize(anchor: String, messages: &[Message]) -> Message {
    let versions: Vec<Message> = messages.iter().map(Message::as_version).collect();
    let latest = versions.len() - 1;
    let mut slot = Message {
        uuid: anchor,
        versions: Some(versions),
        current_version_index: Some(latest),
        ..messages[0].as_version()
    };
    slot.mirror_current();
    slot
}
