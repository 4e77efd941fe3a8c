//! Herald Daemon
//!
//! Polls a fleet of remote message sources and stores what they return.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repositories: Postgres persistence (clients, signing keys, messages)
//! - Scheduler: In-process recurring job engine and the per-client adapter
//! - Services: Registry, poll engine, failure escalation, transforms
//! - API: Administrative HTTP endpoints
//!
//! Every registered client gets one recurring poll job. Consecutive poll
//! failures are counted on the client record; crossing the threshold emits
//! a `poll-server-error` event and, by default, pauses the client.

mod api;
mod config;
mod db;
mod error;
mod repository;
mod scheduler;
mod service;
mod transport;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::repository::{PgClientRepository, PgKeyStore, PgMessageStore};
use crate::scheduler::{POLL_SERVERS, SchedulerAdapter, TokioJobEngine};
use crate::service::{
    ClientRegistry, EscalationPolicy, EscalationSettings, EventBus, HeraldEvent, PollEngine,
    StaticAuthorizer, TransformPipeline,
};
use crate::transport::HttpPollTransport;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_daemon=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Herald Daemon");

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: bind_addr={}, startup clients={}, notify after {} errors",
        config.bind_addr,
        config.clients.len(),
        config.max_poll_errors_before_notify
    );

    // Database
    let pool = connect_with_retry(&config.database_url).await?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Database ready");

    // Repositories
    let clients = Arc::new(PgClientRepository::new(pool.clone()));
    let keys = Arc::new(PgKeyStore::new(pool.clone()));
    let messages = Arc::new(PgMessageStore::new(pool));

    // Scheduling and services
    let engine = Arc::new(TokioJobEngine::new());
    let scheduler = Arc::new(SchedulerAdapter::new(engine.clone()));
    let events = EventBus::default();

    let escalation = Arc::new(EscalationPolicy::new(
        clients.clone(),
        scheduler.clone(),
        events.clone(),
        EscalationSettings {
            max_poll_errors_before_notify: config.max_poll_errors_before_notify,
            stop_polling_after_notify: config.stop_polling_after_notify,
        },
    ));

    let transport =
        Arc::new(HttpPollTransport::new(config.request_timeout).context("Failed to build HTTP client")?);

    let poller = Arc::new(PollEngine::new(
        clients.clone(),
        keys,
        transport,
        Arc::new(TransformPipeline::with_defaults()),
        messages,
        escalation,
    ));

    engine.define(POLL_SERVERS, poller).await;

    let registry = Arc::new(ClientRegistry::new(
        clients,
        scheduler,
        Arc::new(StaticAuthorizer::new(config.admin_actors.clone())),
    ));

    info!("Services initialized");

    spawn_event_logger(&events);

    // Startup clients
    for client in config.clients.iter().cloned() {
        registry
            .register(client)
            .await
            .context("Failed to register startup client")?;
    }

    if config.enable_scheduled_jobs {
        let started = registry
            .restore_schedules()
            .await
            .context("Failed to schedule message clients")?;
        info!(
            "Polling {} message client(s), {} job(s) active",
            started,
            engine.job_count().await
        );
    } else {
        warn!("Scheduled jobs are disabled, no client will be polled");
    }

    // Admin API
    let app = api::create_router(AppState { registry });

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    engine.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Herald Daemon stopped");

    Ok(())
}

/// Logs every daemon event; delivery to humans happens elsewhere
fn spawn_event_logger(events: &EventBus) {
    let mut rx = events.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(HeraldEvent::PollServerError {
                    client_id,
                    endpoint,
                }) => {
                    warn!(
                        "Message client {} reached its poll error threshold (endpoint: {})",
                        client_id, endpoint
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event logger lagged, {} event(s) skipped", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Connects to Postgres with exponential backoff
///
/// The database may still be starting when the daemon comes up (common in
/// container environments).
async fn connect_with_retry(database_url: &str) -> Result<PgPool> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match db::create_pool(database_url).await {
            Ok(pool) => {
                if attempt > 1 {
                    info!("Connected to database after {} attempt(s)", attempt);
                }
                return Ok(pool);
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Failed to connect to database after {} attempts", MAX_RETRIES);
                    return Err(anyhow::anyhow!("Failed to connect to database: {}", e));
                }

                warn!(
                    "Failed to connect to database (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
