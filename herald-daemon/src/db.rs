use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Message clients, keyed by the hash of the client id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS message_clients (
            id VARCHAR(64) PRIMARY KEY,
            client_id TEXT NOT NULL,
            label TEXT NOT NULL DEFAULT '',
            endpoint TEXT NOT NULL,
            interval_minutes INTEGER,
            public_key_id TEXT NOT NULL,
            strict_ssl BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            recent_poll_error_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_message_clients_client_id ON message_clients(client_id)",
    )
    .execute(pool)
    .await?;

    // Private signing key material, looked up by public key id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS signing_keys (
            public_key_id TEXT PRIMARY KEY,
            private_key TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Stored messages
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id UUID PRIMARY KEY,
            batch UUID NOT NULL,
            client_id TEXT NOT NULL,
            message_type TEXT,
            recipient TEXT,
            body JSONB NOT NULL,
            stored_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Untyped messages are stored as well
    sqlx::query("ALTER TABLE messages ALTER COLUMN message_type DROP NOT NULL")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_batch ON messages(batch)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
