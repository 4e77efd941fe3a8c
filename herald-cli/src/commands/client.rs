//! Message client command handlers
//!
//! Handles listing, inspecting and updating message clients.

use anyhow::{Result, bail};
use clap::Subcommand;
use colored::*;
use herald_client::HeraldClient;
use herald_core::domain::client::ClientRecord;
use herald_core::dto::client::{ClientQuery, ListOptions, UpdateClient};

use crate::config::Config;

/// Message client subcommands
#[derive(Subcommand)]
pub enum ClientCommands {
    /// List message clients
    List {
        /// Exact client id
        #[arg(long)]
        id: Option<String>,

        /// Exact label
        #[arg(long)]
        label: Option<String>,

        /// Exact endpoint URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Comma separated fields to show (e.g. id,interval)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },
    /// Get a message client record
    Get {
        /// Client id
        id: String,
    },
    /// Update a message client and restart its polling
    Update {
        /// Client id
        id: String,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        endpoint: Option<String>,

        /// Polling interval in minutes
        #[arg(long)]
        interval: Option<u32>,

        #[arg(long)]
        public_key_id: Option<String>,

        /// Validate the endpoint's TLS certificate
        #[arg(long)]
        strict_ssl: Option<bool>,
    },
}

/// Handle message client commands
pub async fn handle_client_command(command: ClientCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        ClientCommands::List {
            id,
            label,
            endpoint,
            fields,
            limit,
            offset,
        } => {
            let query = ClientQuery {
                id,
                label,
                endpoint,
            };
            list_clients(&client, &query, &fields, ListOptions { limit, offset }).await
        }
        ClientCommands::Get { id } => get_client(&client, &id).await,
        ClientCommands::Update {
            id,
            label,
            endpoint,
            interval,
            public_key_id,
            strict_ssl,
        } => {
            let update = UpdateClient {
                id,
                label,
                endpoint,
                interval,
                public_key_id,
                strict_ssl,
            };
            update_client(&client, update).await
        }
    }
}

async fn list_clients(
    client: &HeraldClient,
    query: &ClientQuery,
    fields: &[String],
    options: ListOptions,
) -> Result<()> {
    let clients = client.list_clients(query, fields, options).await?;

    if clients.is_empty() {
        println!("{}", "No message clients found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} message client(s):", clients.len()).bold()
    );
    println!();
    for entry in clients {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    }

    Ok(())
}

async fn get_client(client: &HeraldClient, id: &str) -> Result<()> {
    let record = client.get_client(id).await?;
    print_record(&record);
    Ok(())
}

async fn update_client(client: &HeraldClient, update: UpdateClient) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update: pass at least one of --label, --endpoint, --interval, --public-key-id, --strict-ssl");
    }

    let record = client.update_client(update).await?;

    println!("{} Updated message client {}", "✓".green(), record.client.id.bold());
    println!();
    print_record(&record);

    Ok(())
}

fn print_record(record: &ClientRecord) {
    let config = &record.client;
    let errors = record.meta.recent_poll_error_count;
    let errors = if errors == 0 {
        errors.to_string().green()
    } else {
        errors.to_string().red()
    };

    println!("  {} Client {}", "▸".cyan(), config.id.bold());
    println!("    Label:        {}", config.label);
    println!("    Endpoint:     {}", config.endpoint);
    println!(
        "    Interval:     {}",
        config
            .interval
            .map(|m| format!("{} min", m))
            .unwrap_or_else(|| "not scheduled".dimmed().to_string())
    );
    println!("    Key:          {}", config.public_key_id);
    println!("    Strict SSL:   {}", config.strict_ssl);
    println!("    Poll errors:  {}", errors);
    println!(
        "    Created:      {}",
        record
            .meta
            .created
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!(
        "    Updated:      {}",
        record
            .meta
            .updated
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}
