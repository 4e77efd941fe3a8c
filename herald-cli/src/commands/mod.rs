//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod client;

pub use client::ClientCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Message client management
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },
    /// Check that the daemon is reachable
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Client { command } => client::handle_client_command(command, config).await,
        Commands::Health => {
            config.client().health().await?;
            println!("{} {}", "✓".green(), config.daemon_url);
            Ok(())
        }
    }
}
