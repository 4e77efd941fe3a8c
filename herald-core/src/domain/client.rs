//! Message client domain model
//!
//! A message client is one remote message source polled on a fixed interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Configuration of a remote message source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Globally unique, opaque identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub label: String,

    /// URL polled for new messages
    pub endpoint: String,

    /// Polling interval in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,

    /// Identifier of the signing key pair held by the key store
    pub public_key_id: String,

    /// Whether TLS certificates of the endpoint are validated
    #[serde(rename = "strictSSL", default = "default_strict_ssl")]
    pub strict_ssl: bool,
}

fn default_strict_ssl() -> bool {
    true
}

/// Bookkeeping stored alongside a client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMeta {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,

    /// Consecutive failed polls since the last success or pause
    pub recent_poll_error_count: u32,
}

/// Persisted envelope around a [`ClientConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// `client_hash(client.id)`, unique across the registry
    pub id: String,
    pub meta: ClientMeta,
    pub client: ClientConfig,
}

impl ClientRecord {
    /// Creates a fresh record with a zeroed failure counter
    pub fn new(client: ClientConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: client_hash(&client.id),
            meta: ClientMeta {
                created: now,
                updated: now,
                recent_poll_error_count: 0,
            },
            client,
        }
    }
}

/// Stable storage key for a client id (lowercase hex SHA-256)
pub fn client_hash(client_id: &str) -> String {
    format!("{:x}", Sha256::digest(client_id.as_bytes()))
}
