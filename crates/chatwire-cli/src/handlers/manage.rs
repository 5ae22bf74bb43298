//! Conversation lifecycle commands: new, archive, unarchive, delete.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chatwire_core::NewConversation;

use crate::bootstrap::CliContext;

pub async fn create(
    ctx: &CliContext,
    name: String,
    project: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let conversation = ctx
        .conversations
        .create_conversation(NewConversation {
            name,
            project_uuid: project,
            model_id: model,
        })
        .await
        .context("could not create conversation")?;
    println!("Created {} ({})", conversation.name, conversation.uuid);
    Ok(())
}

pub async fn archive(ctx: &CliContext, uuid: &str) -> Result<()> {
    ctx.conversations
        .archive_conversation(uuid)
        .await
        .context("could not archive conversation")?;
    println!("Archived {uuid}");
    Ok(())
}

pub async fn unarchive(ctx: &CliContext, uuid: &str) -> Result<()> {
    let conversation = ctx
        .conversations
        .unarchive_conversation(uuid)
        .await
        .context("could not unarchive conversation")?;
    println!("Restored {} ({})", conversation.name, conversation.uuid);
    Ok(())
}

pub async fn delete(ctx: &CliContext, uuid: &str, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete conversation {uuid}?"))? {
        println!("Cancelled.");
        return Ok(());
    }
    ctx.conversations
        .delete_conversation(uuid)
        .await
        .context("could not delete conversation")?;
    println!("Deleted {uuid}");
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
