//! CLI entry point - the composition root.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use chatwire_cli::handlers::{self, send::SendArgs};
use chatwire_cli::{Cli, CliConfig, Commands, bootstrap};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let mut cli = Cli::parse();

    let default_filter = if cli.verbose {
        "chatwire=debug,chatwire_core=debug,chatwire_http=debug"
    } else {
        "chatwire=info,chatwire_core=warn,chatwire_http=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command.take() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::from_cli(&cli)?;
    let ctx = bootstrap(&config)?;

    match command {
        Commands::Conversations {
            page,
            project,
            search,
        } => handlers::conversations::execute(&ctx, page, project, search).await?,
        Commands::Show { uuid, older } => handlers::show::execute(&ctx, &uuid, older).await?,
        Commands::Send {
            conversation,
            text,
            model,
            files,
            no_stream,
        } => {
            let args = SendArgs {
                conversation,
                text,
                model,
                files,
                no_stream,
            };
            handlers::send::execute(&ctx, args).await?;
        }
        Commands::Regenerate {
            conversation,
            message,
            model,
            no_stream,
        } => {
            handlers::send::regenerate(&ctx, &conversation, &message, model, no_stream).await?;
        }
        Commands::Version {
            conversation,
            message,
            index,
        } => handlers::send::switch_version(&ctx, &conversation, &message, index).await?,
        Commands::New {
            name,
            project,
            model,
        } => handlers::manage::create(&ctx, name, project, model).await?,
        Commands::Archive { uuid } => handlers::manage::archive(&ctx, &uuid).await?,
        Commands::Unarchive { uuid } => handlers::manage::unarchive(&ctx, &uuid).await?,
        Commands::Delete { uuid, force } => handlers::manage::delete(&ctx, &uuid, force).await?,
    }

    Ok(())
}
