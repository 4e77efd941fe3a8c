//! In-memory fakes used by the service tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use herald_core::domain::client::{ClientConfig, ClientRecord};
use herald_core::domain::message::Message;
use herald_core::dto::client::{ClientQuery, ListOptions, UpdateClient};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{StorageError, TransportError};
use crate::repository::{ClientRepository, KeyStore, MessageStore, StoredBatch};
use crate::transport::{PollTransport, RemoteResponse, SignedGet};

pub fn client_config(id: &str, interval: u32) -> ClientConfig {
    ClientConfig {
        id: id.to_string(),
        label: format!("Client {}", id),
        endpoint: "https://alpha.example.com/messages?state=new".to_string(),
        interval: Some(interval),
        public_key_id: "https://alpha.example.com/keys/1".to_string(),
        strict_ssl: false,
    }
}

#[derive(Default)]
pub struct MemoryClientRepository {
    records: Mutex<Vec<ClientRecord>>,
    fail_writes: Mutex<bool>,
}

impl MemoryClientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, client: ClientConfig) {
        self.records
            .lock()
            .await
            .push(ClientRecord::new(client, Utc::now()));
    }

    pub async fn error_count(&self, client_id: &str) -> u32 {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.client.id == client_id)
            .map(|r| r.meta.recent_poll_error_count)
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Makes every counter write fail
    pub async fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().await = fail;
    }

    async fn check_writable(&self) -> Result<(), StorageError> {
        if *self.fail_writes.lock().await {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    async fn modify<F>(&self, client_id: &str, f: F) -> Result<u32, StorageError>
    where
        F: FnOnce(&mut ClientRecord),
    {
        self.check_writable().await?;
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.client.id == client_id)
            .ok_or_else(|| StorageError::RecordMissing(client_id.to_string()))?;
        f(record);
        Ok(record.meta.recent_poll_error_count)
    }
}

#[async_trait]
impl ClientRepository for MemoryClientRepository {
    async fn insert_if_absent(&self, record: ClientRecord) -> Result<bool, StorageError> {
        let mut records = self.records.lock().await;
        if records.iter().any(|r| r.id == record.id) {
            return Ok(false);
        }
        records.push(record);
        Ok(true)
    }

    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, StorageError> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .find(|r| r.client.id == client_id)
            .cloned())
    }

    async fn list(
        &self,
        query: &ClientQuery,
        options: ListOptions,
    ) -> Result<Vec<ClientRecord>, StorageError> {
        let records = self.records.lock().await;
        let offset = options.offset.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(records
            .iter()
            .filter(|r| query.matches(&r.client))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_config(
        &self,
        update: &UpdateClient,
    ) -> Result<Option<ClientRecord>, StorageError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.iter_mut().find(|r| r.client.id == update.id) else {
            return Ok(None);
        };
        update.apply_to(&mut record.client);
        record.meta.updated = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn increment_error_count(&self, client_id: &str) -> Result<u32, StorageError> {
        self.modify(client_id, |r| r.meta.recent_poll_error_count += 1)
            .await
    }

    async fn reset_error_count(&self, client_id: &str) -> Result<(), StorageError> {
        self.modify(client_id, |r| r.meta.recent_poll_error_count = 0)
            .await
            .map(|_| ())
    }
}

#[derive(Default)]
pub struct MemoryKeyStore {
    keys: HashMap<String, String>,
}

impl MemoryKeyStore {
    pub fn with_key(public_key_id: &str, private_key: &str) -> Self {
        let mut keys = HashMap::new();
        keys.insert(public_key_id.to_string(), private_key.to_string());
        Self { keys }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn private_key(&self, public_key_id: &str) -> Result<Option<String>, StorageError> {
        Ok(self.keys.get(public_key_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    stored: Mutex<Vec<(Uuid, Message)>>,
    calls: Mutex<usize>,
    fail: Mutex<bool>,
}

impl MemoryMessageStore {
    pub async fn batch(&self, batch: Uuid) -> Vec<Message> {
        self.stored
            .lock()
            .await
            .iter()
            .filter(|(b, _)| *b == batch)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub async fn calls(&self) -> usize {
        *self.calls.lock().await
    }

    /// Makes every commit fail
    pub async fn fail_stores(&self, fail: bool) {
        *self.fail.lock().await = fail;
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn store(
        &self,
        _client_id: &str,
        messages: Vec<Message>,
    ) -> Result<StoredBatch, StorageError> {
        *self.calls.lock().await += 1;
        if *self.fail.lock().await {
            return Err(StorageError::Unavailable("message store down".to_string()));
        }
        let batch = Uuid::new_v4();
        let count = messages.len();
        self.stored
            .lock()
            .await
            .extend(messages.into_iter().map(|m| (batch, m)));
        Ok(StoredBatch { batch, count })
    }
}

/// Replays queued responses; an empty queue behaves like an unreachable host
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<RemoteResponse>>,
    requests: Mutex<Vec<(String, String, bool)>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn respond(&self, status: u16, body: impl Into<String>) {
        self.responses.lock().await.push_back(RemoteResponse {
            status,
            body: body.into(),
        });
    }

    /// (url, key id, strict ssl) of every request issued
    pub async fn requests(&self) -> Vec<(String, String, bool)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PollTransport for ScriptedTransport {
    async fn signed_get(&self, request: SignedGet<'_>) -> Result<RemoteResponse, TransportError> {
        self.requests.lock().await.push((
            request.url.to_string(),
            request.key_id.to_string(),
            request.strict_ssl,
        ));

        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| TransportError::InvalidUrl(request.url.to_string()))
    }
}
