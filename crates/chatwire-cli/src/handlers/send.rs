//! `send`, `regenerate` and `version` - generation commands.

use std::future::Future;

use anyhow::{Context, Result};
use chatwire_core::{
    Message, RegenerateRequest, SendRequest, SessionError, SessionOutcome,
};

use crate::bootstrap::CliContext;
use crate::handlers::show::open;
use crate::presentation::{StreamPrinter, version_label};

pub struct SendArgs {
    pub conversation: String,
    pub text: String,
    pub model: String,
    pub files: Vec<String>,
    pub no_stream: bool,
}

pub async fn execute(ctx: &CliContext, args: SendArgs) -> Result<()> {
    let request =
        SendRequest::new(&args.conversation, args.text, args.model).with_files(args.files);

    if args.no_stream {
        let reply = ctx
            .sessions
            .send_once(request)
            .await
            .context("send failed")?;
        print_reply(reply.as_ref());
        return Ok(());
    }

    let session = ctx.sessions.send(request);
    let (outcome, printer) = follow(ctx, &args.conversation, session).await;
    finish(outcome.context("send failed")?, printer);
    Ok(())
}

pub async fn regenerate(
    ctx: &CliContext,
    conversation: &str,
    message: &str,
    model: String,
    no_stream: bool,
) -> Result<()> {
    open(ctx, conversation).await?;
    let request = RegenerateRequest {
        message_uuid: message.to_string(),
        model_id: model,
        conversation_uuid: conversation.to_string(),
    };

    if no_stream {
        let reply = ctx
            .sessions
            .regenerate_once(request)
            .await
            .context("regenerate failed")?;
        print_reply(reply.as_ref());
    } else {
        let session = ctx.sessions.regenerate(request);
        let (outcome, printer) = follow(ctx, conversation, session).await;
        finish(outcome.context("regenerate failed")?, printer);
    }

    let label = ctx.store.read(|state| {
        state
            .find_message(conversation, message)
            .map(version_label)
            .unwrap_or_default()
    });
    if !label.is_empty() {
        println!("(now showing{label})");
    }
    Ok(())
}

pub async fn switch_version(
    ctx: &CliContext,
    conversation: &str,
    message: &str,
    index: usize,
) -> Result<()> {
    open(ctx, conversation).await?;
    ctx.sessions
        .switch_version(conversation, message, index)
        .context("could not switch version")?;

    let shown = ctx.store.read(|state| state.find_message(conversation, message).cloned());
    if let Some(shown) = shown {
        println!("{}{}", shown.uuid, version_label(&shown));
        println!("{}", shown.content);
    }
    Ok(())
}

/// Drive a session while echoing the conversation's streaming text.
/// Ctrl-C cancels the session instead of killing the process.
async fn follow<F>(
    ctx: &CliContext,
    conversation: &str,
    session: F,
) -> (Result<SessionOutcome, SessionError>, StreamPrinter)
where
    F: Future<Output = Result<SessionOutcome, SessionError>>,
{
    let mut updates = ctx.store.subscribe();
    let mut printer = StreamPrinter::new();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(session, interrupt);
    let mut interrupted = false;

    loop {
        tokio::select! {
            outcome = &mut session => return (outcome, printer),
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                ctx.sessions.cancel(conversation).await;
            }
            Ok(()) = updates.changed() => {
                let text = updates
                    .borrow_and_update()
                    .streaming(conversation)
                    .map(|s| s.visible_text().to_string());
                if let Some(text) = text {
                    printer.update(&text);
                }
            }
        }
    }
}

fn finish(outcome: SessionOutcome, mut printer: StreamPrinter) {
    match outcome {
        SessionOutcome::Completed(Some(message)) => {
            printer.update(&message.content);
            println!();
            if let Some(model) = message.model_name.as_deref() {
                println!("-- {model} ({})", message.uuid);
            }
        }
        SessionOutcome::Completed(None) => {
            println!("\n(no reply was stored)");
        }
        SessionOutcome::Incomplete => {
            println!("\n(the reply ended early)");
        }
        SessionOutcome::Cancelled => {
            println!("\n(cancelled)");
        }
    }
}

fn print_reply(reply: Option<&Message>) {
    match reply {
        Some(message) => {
            println!("{}", message.content);
            if let Some(model) = message.model_name.as_deref() {
                println!("-- {model} ({})", message.uuid);
            }
        }
        None => println!("(no reply was stored)"),
    }
}
