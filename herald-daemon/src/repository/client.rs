//! Message Client Repository
//!
//! Handles all database operations related to message clients. Every
//! operation touches a single record keyed by the client id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_core::domain::client::{ClientConfig, ClientMeta, ClientRecord, client_hash};
use herald_core::dto::client::{ClientQuery, ListOptions, UpdateClient};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::StorageError;

/// Persisted registry of message clients
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Inserts a record unless one with the same id already exists
    ///
    /// # Returns
    /// `true` if the record was inserted, `false` if it was already present
    async fn insert_if_absent(&self, record: ClientRecord) -> Result<bool, StorageError>;

    /// Finds a record by its (unhashed) client id
    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, StorageError>;

    /// Lists records matching `query`, oldest first
    async fn list(
        &self,
        query: &ClientQuery,
        options: ListOptions,
    ) -> Result<Vec<ClientRecord>, StorageError>;

    /// Applies a partial configuration update
    ///
    /// # Returns
    /// The updated record, or `None` if no record matches `update.id`
    async fn update_config(
        &self,
        update: &UpdateClient,
    ) -> Result<Option<ClientRecord>, StorageError>;

    /// Atomically increments the recent poll error count
    ///
    /// # Returns
    /// The count after the increment
    async fn increment_error_count(&self, client_id: &str) -> Result<u32, StorageError>;

    /// Sets the recent poll error count back to zero
    async fn reset_error_count(&self, client_id: &str) -> Result<(), StorageError>;
}

/// Postgres implementation of ClientRepository
#[derive(Clone)]
pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CLIENT_COLUMNS: &str = "id, client_id, label, endpoint, interval_minutes, public_key_id, \
     strict_ssl, created_at, updated_at, recent_poll_error_count";

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn insert_if_absent(&self, record: ClientRecord) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_clients (id, client_id, label, endpoint, interval_minutes,
                public_key_id, strict_ssl, created_at, updated_at, recent_poll_error_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.client.id)
        .bind(&record.client.label)
        .bind(&record.client.endpoint)
        .bind(record.client.interval.map(to_db_int))
        .bind(&record.client.public_key_id)
        .bind(record.client.strict_ssl)
        .bind(record.meta.created)
        .bind(record.meta.updated)
        .bind(to_db_int(record.meta.recent_poll_error_count))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, StorageError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM message_clients WHERE id = $1"
        ))
        .bind(client_hash(client_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(
        &self,
        query: &ClientQuery,
        options: ListOptions,
    ) -> Result<Vec<ClientRecord>, StorageError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {CLIENT_COLUMNS} FROM message_clients WHERE TRUE"
        ));

        if let Some(id) = &query.id {
            builder.push(" AND id = ").push_bind(client_hash(id));
        }
        if let Some(label) = &query.label {
            builder.push(" AND label = ").push_bind(label.clone());
        }
        if let Some(endpoint) = &query.endpoint {
            builder.push(" AND endpoint = ").push_bind(endpoint.clone());
        }

        builder.push(" ORDER BY created_at ASC");

        if let Some(limit) = options.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }
        if let Some(offset) = options.offset {
            builder.push(" OFFSET ").push_bind(i64::from(offset));
        }

        let rows = builder
            .build_query_as::<ClientRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_config(
        &self,
        update: &UpdateClient,
    ) -> Result<Option<ClientRecord>, StorageError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            r#"
            UPDATE message_clients
            SET label = COALESCE($2, label),
                endpoint = COALESCE($3, endpoint),
                interval_minutes = COALESCE($4, interval_minutes),
                public_key_id = COALESCE($5, public_key_id),
                strict_ssl = COALESCE($6, strict_ssl),
                updated_at = $7
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(client_hash(&update.id))
        .bind(update.label.as_deref())
        .bind(update.endpoint.as_deref())
        .bind(update.interval.map(to_db_int))
        .bind(update.public_key_id.as_deref())
        .bind(update.strict_ssl)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn increment_error_count(&self, client_id: &str) -> Result<u32, StorageError> {
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE message_clients
            SET recent_poll_error_count = recent_poll_error_count + 1
            WHERE id = $1
            RETURNING recent_poll_error_count
            "#,
        )
        .bind(client_hash(client_id))
        .fetch_optional(&self.pool)
        .await?;

        count
            .map(from_db_int)
            .ok_or_else(|| StorageError::RecordMissing(client_id.to_string()))
    }

    async fn reset_error_count(&self, client_id: &str) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE message_clients SET recent_poll_error_count = 0 WHERE id = $1",
        )
        .bind(client_hash(client_id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::RecordMissing(client_id.to_string()));
        }

        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn to_db_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_db_int(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: String,
    client_id: String,
    label: String,
    endpoint: String,
    interval_minutes: Option<i32>,
    public_key_id: String,
    strict_ssl: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    recent_poll_error_count: i32,
}

impl From<ClientRow> for ClientRecord {
    fn from(row: ClientRow) -> Self {
        ClientRecord {
            id: row.id,
            meta: ClientMeta {
                created: row.created_at,
                updated: row.updated_at,
                recent_poll_error_count: from_db_int(row.recent_poll_error_count),
            },
            client: ClientConfig {
                id: row.client_id,
                label: row.label,
                endpoint: row.endpoint,
                interval: row.interval_minutes.map(from_db_int),
                public_key_id: row.public_key_id,
                strict_ssl: row.strict_ssl,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_int_conversions_saturate() {
        assert_eq!(to_db_int(10), 10);
        assert_eq!(to_db_int(u32::MAX), i32::MAX);
        assert_eq!(from_db_int(-1), 0);
        assert_eq!(from_db_int(3), 3);
    }

    #[test]
    fn test_row_into_record() {
        let now = Utc::now();
        let record: ClientRecord = ClientRow {
            id: client_hash("message.test"),
            client_id: "message.test".to_string(),
            label: "Message Test".to_string(),
            endpoint: "https://alpha.example.com/messages".to_string(),
            interval_minutes: Some(1),
            public_key_id: "key-1".to_string(),
            strict_ssl: false,
            created_at: now,
            updated_at: now,
            recent_poll_error_count: 2,
        }
        .into();

        assert_eq!(record.client.id, "message.test");
        assert_eq!(record.client.interval, Some(1));
        assert_eq!(record.meta.recent_poll_error_count, 2);
    }
}
