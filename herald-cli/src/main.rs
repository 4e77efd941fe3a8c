//! Herald CLI
//!
//! Command-line interface for administering the message clients of a
//! Herald daemon.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Herald message client administration", long_about = None)]
struct Cli {
    /// Daemon URL
    #[arg(long, env = "HERALD_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Actor id sent with administrative requests
    #[arg(long, env = "HERALD_ACTOR", default_value = "admin")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        daemon_url: cli.url,
        actor: cli.actor,
    };

    handle_command(cli.command, &config).await
}
