//! Message store
//!
//! Final destination of polled messages. Deduplication is not done here.

use async_trait::async_trait;
use herald_core::domain::message::Message;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StorageError;

/// Result of committing one poll's messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredBatch {
    /// Shared by every message committed in the same call
    pub batch: Uuid,
    pub count: usize,
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Commits `messages` in order as one batch
    async fn store(&self, client_id: &str, messages: Vec<Message>)
    -> Result<StoredBatch, StorageError>;
}

/// Postgres implementation of MessageStore
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn store(
        &self,
        client_id: &str,
        messages: Vec<Message>,
    ) -> Result<StoredBatch, StorageError> {
        let batch = Uuid::new_v4();
        let now = chrono::Utc::now();
        let count = messages.len();

        let mut tx = self.pool.begin().await?;

        for message in messages {
            let body = serde_json::to_value(&message)?;

            sqlx::query(
                r#"
                INSERT INTO messages (id, batch, client_id, message_type, recipient, body, stored_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(batch)
            .bind(client_id)
            .bind(message.message_type())
            .bind(message.recipient())
            .bind(body)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Stored {} message(s) in batch {}", count, batch);

        Ok(StoredBatch { batch, count })
    }
}
