//! Available subcommands.

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// List conversations, most recently updated first
    Conversations {
        /// Page to show (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Only conversations of this project
        #[arg(long)]
        project: Option<String>,
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print a conversation's transcript
    Show {
        uuid: String,
        /// Also load this many older pages
        #[arg(long, default_value_t = 0)]
        older: u32,
    },

    /// Send a message and print the reply as it streams
    Send {
        conversation: String,
        text: String,
        /// Model to answer with
        #[arg(short, long, env = "CHATWIRE_MODEL")]
        model: String,
        /// Attach previously uploaded files
        #[arg(long = "file")]
        files: Vec<String>,
        /// Wait for the whole reply instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },

    /// Generate another version of an assistant message
    Regenerate {
        conversation: String,
        message: String,
        #[arg(short, long, env = "CHATWIRE_MODEL")]
        model: String,
        #[arg(long)]
        no_stream: bool,
    },

    /// Show another version of a regenerated message
    Version {
        conversation: String,
        message: String,
        /// Zero-based version index
        index: usize,
    },

    /// Create a conversation
    New {
        name: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(short, long, env = "CHATWIRE_MODEL")]
        model: Option<String>,
    },

    /// Hide a conversation from the list
    Archive { uuid: String },

    /// Bring back an archived conversation
    Unarchive { uuid: String },

    /// Delete a conversation
    Delete {
        uuid: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}
