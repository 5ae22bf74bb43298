//! `conversations` - one page of the conversation list.

use anyhow::{Context, Result};
use chatwire_core::{ConversationFilters, ListScope};

use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, truncate_string};

pub async fn execute(
    ctx: &CliContext,
    page: u32,
    project: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let scope = ListScope::from_project(project.as_deref());
    let filters = ConversationFilters {
        project_uuid: project,
        search,
    };
    ctx.conversations
        .load_conversations(page, &filters)
        .await
        .context("could not list conversations")?;

    let state = ctx.store.snapshot();
    if state.conversations.is_empty() {
        println!("No conversations found.");
        println!("Use 'chatwire new <name>' to start one.");
        return Ok(());
    }

    println!("{:<38} {:<32} {:<17} Model", "UUID", "Name", "Updated");
    print_separator(100);
    for conversation in state.conversations.values() {
        println!(
            "{:<38} {:<32} {:<17} {}",
            conversation.uuid,
            truncate_string(&conversation.name, 31),
            conversation.updated_at.format("%Y-%m-%d %H:%M"),
            conversation.model_id.as_deref().unwrap_or("--"),
        );
    }

    if let Some(cursor) = state.conversation_cursor(&scope) {
        println!(
            "\nPage {} of {} ({} total)",
            cursor.page,
            cursor.total_pages.max(1),
            cursor.total
        );
        if let Some(next) = cursor.next_page() {
            println!("Use '--page {next}' for more.");
        }
    }
    Ok(())
}
