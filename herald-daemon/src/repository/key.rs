//! Signing key store
//!
//! Resolves the private half of a signing key pair from its public key id.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StorageError;

#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Looks up the private key material for `public_key_id`
    ///
    /// Returns the base64 encoded Ed25519 seed, or `None` when the key
    /// store holds no private key for that id.
    async fn private_key(&self, public_key_id: &str) -> Result<Option<String>, StorageError>;
}

/// Postgres implementation of KeyStore
#[derive(Clone)]
pub struct PgKeyStore {
    pool: PgPool,
}

impl PgKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn private_key(&self, public_key_id: &str) -> Result<Option<String>, StorageError> {
        let key: Option<String> =
            sqlx::query_scalar("SELECT private_key FROM signing_keys WHERE public_key_id = $1")
                .bind(public_key_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(key)
    }
}
