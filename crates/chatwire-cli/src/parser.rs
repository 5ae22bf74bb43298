//! Main CLI parser and global options.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for a chatwire backend.
#[derive(Parser)]
#[command(name = "chatwire")]
#[command(about = "Browse conversations and stream replies from a chat backend")]
#[command(version)]
pub struct Cli {
    /// Base URL of the chat API
    #[arg(
        long,
        env = "CHATWIRE_BASE_URL",
        global = true,
        default_value = "http://localhost:8000/api"
    )]
    pub base_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "CHATWIRE_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Ceiling for non-streaming requests, in seconds
    #[arg(long, env = "CHATWIRE_TIMEOUT_SECS", global = true, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Minimum interval between transcript refreshes while streaming
    #[arg(long, env = "CHATWIRE_THROTTLE_MS", global = true)]
    pub throttle_ms: Option<u64>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
