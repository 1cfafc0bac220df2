//! Unloop CLI entry point.
//!
//! Binary name: `unloop`
//!
//! Parses CLI arguments, loads configuration, then dispatches to the
//! chat journey or one of the inspection commands.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, KeyCommand, SessionCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,unloop=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "unloop", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Chat => {
            cli::chat::run_chat(&state).await?;
        }

        Commands::Sessions { action } => match action {
            SessionCommand::List => {
                cli::session::list_sessions(&state, cli.json).await?;
            }
            SessionCommand::Show { id } => {
                cli::session::show_session(&state, &id, cli.json).await?;
            }
            SessionCommand::Rename { id, label } => {
                cli::session::rename_session(&state, &id, &label, cli.json).await?;
            }
        },

        Commands::Key { action } => match action {
            KeyCommand::Set { value } => {
                cli::key::set_key(&state, value.as_deref()).await?;
            }
            KeyCommand::Clear => {
                cli::key::clear_key(&state).await?;
            }
            KeyCommand::Status => {
                cli::key::key_status(&state, cli.json).await?;
            }
        },

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
