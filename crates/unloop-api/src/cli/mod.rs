//! CLI command definitions and dispatch for the `unloop` binary.
//!
//! Uses clap derive macros. The interactive reflection journey lives
//! under `unloop chat`; everything else is inspection and key management.

pub mod chat;
pub mod key;
pub mod session;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// A conversational self-reflection companion.
#[derive(Parser)]
#[command(name = "unloop", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a guided reflection session.
    Chat,

    /// Browse past sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Manage the Gemini API key.
    Key {
        #[command(subcommand)]
        action: KeyCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    /// List saved sessions, most recent first.
    #[command(alias = "ls")]
    List,

    /// Show one session in full (id may be a unique prefix).
    Show {
        /// Session id or unique id prefix.
        id: String,
    },

    /// Rename a session's label.
    Rename {
        /// Session id or unique id prefix.
        id: String,

        /// The new label.
        label: String,
    },
}

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Store an API key (prompted securely if omitted).
    Set {
        /// The key value (optional; prompts if omitted).
        #[arg(long)]
        value: Option<String>,
    },

    /// Remove the stored key file.
    Clear,

    /// Show whether a usable key is available.
    Status,
}
