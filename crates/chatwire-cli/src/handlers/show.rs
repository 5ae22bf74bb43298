//! `show` - print a conversation's transcript.

use anyhow::{Context, Result, bail};

use crate::bootstrap::CliContext;
use crate::presentation::{format_message, print_separator};

pub async fn execute(ctx: &CliContext, uuid: &str, older: u32) -> Result<()> {
    open(ctx, uuid).await?;

    for _ in 0..older {
        let loaded = ctx
            .conversations
            .load_more_messages(uuid)
            .await
            .context("could not load older messages")?;
        if !loaded {
            break;
        }
    }

    let state = ctx.store.snapshot();
    if let Some(conversation) = state.conversation(uuid) {
        println!("{}", conversation.name);
        print_separator(60);
    }
    if state
        .message_cursor(uuid)
        .is_some_and(chatwire_core::PageCursor::has_more)
    {
        println!("(older messages available, use --older N)\n");
    }
    for message in state.messages_for(uuid) {
        println!("{}\n", format_message(message));
    }
    Ok(())
}

/// Select the conversation, loading its newest messages.
pub(crate) async fn open(ctx: &CliContext, uuid: &str) -> Result<()> {
    ctx.conversations
        .select_conversation(uuid)
        .await
        .context("could not open conversation")?;
    let selected = ctx
        .store
        .read(|state| state.current_conversation.as_deref() == Some(uuid));
    if !selected {
        bail!("conversation {uuid} not found");
    }
    Ok(())
}
