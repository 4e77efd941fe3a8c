//! Poll engine
//!
//! One poll cycle for one client: re-read the record, sign and send the
//! GET, classify the response, transform and store the messages, then hand
//! the outcome to the escalation policy. Runs as the handler of the
//! `herald.jobs.PollServers` job type.

use std::sync::Arc;

use async_trait::async_trait;
use herald_core::domain::client::ClientConfig;
use herald_core::domain::message::Message;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PollCause, PollError, PollServerError};
use crate::repository::{ClientRepository, KeyStore, MessageStore};
use crate::scheduler::{JobHandler, JobSpec};
use crate::service::escalation::EscalationPolicy;
use crate::service::transform::TransformPipeline;
use crate::transport::{PollTransport, SignedGet, decode_private_key};

/// Result of a successful poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub client_id: String,

    /// Number of messages returned by the remote endpoint
    pub received: usize,

    /// Batch the messages were committed under; `None` when nothing was returned
    pub batch: Option<Uuid>,
}

pub struct PollEngine {
    repository: Arc<dyn ClientRepository>,
    keys: Arc<dyn KeyStore>,
    transport: Arc<dyn PollTransport>,
    pipeline: Arc<TransformPipeline>,
    store: Arc<dyn MessageStore>,
    escalation: Arc<EscalationPolicy>,
}

impl PollEngine {
    pub fn new(
        repository: Arc<dyn ClientRepository>,
        keys: Arc<dyn KeyStore>,
        transport: Arc<dyn PollTransport>,
        pipeline: Arc<TransformPipeline>,
        store: Arc<dyn MessageStore>,
        escalation: Arc<EscalationPolicy>,
    ) -> Self {
        Self {
            repository,
            keys,
            transport,
            pipeline,
            store,
            escalation,
        }
    }

    /// Runs one poll cycle for `client_id`
    ///
    /// The client configuration is read fresh from the registry so admin
    /// updates apply from the next firing on. Failures are counted before
    /// they are returned.
    pub async fn poll_once(&self, client_id: &str) -> Result<PollOutcome, PollError> {
        let record = self
            .repository
            .find_by_client_id(client_id)
            .await
            .map_err(PollError::Bookkeeping)?
            .ok_or_else(|| PollError::UnknownClient(client_id.to_string()))?;

        let current_count = record.meta.recent_poll_error_count;
        let client = record.client;

        match self.fetch_and_store(&client).await {
            Ok(outcome) => {
                self.escalation.record_success(&client.id).await?;
                Ok(outcome)
            }
            Err(e) => Err(self
                .escalation
                .record_failure(&client, current_count, e)
                .await),
        }
    }

    async fn fetch_and_store(&self, client: &ClientConfig) -> Result<PollOutcome, PollError> {
        let messages = self.fetch(client).await?;
        let received = messages.len();

        if messages.is_empty() {
            debug!("Client {} returned no messages", client.id);
            return Ok(PollOutcome {
                client_id: client.id.clone(),
                received,
                batch: None,
            });
        }

        let messages = self.pipeline.transform(messages);
        let stored = self
            .store
            .store(&client.id, messages)
            .await
            .map_err(PollError::Store)?;

        info!(
            "Stored {} message(s) from client {} in batch {}",
            stored.count, client.id, stored.batch
        );

        Ok(PollOutcome {
            client_id: client.id.clone(),
            received,
            batch: Some(stored.batch),
        })
    }

    async fn fetch(&self, client: &ClientConfig) -> Result<Vec<Message>, PollServerError> {
        let server_error = |cause: PollCause| PollServerError::new(&client.endpoint, cause);

        let private_key = self
            .keys
            .private_key(&client.public_key_id)
            .await
            .map_err(|e| server_error(PollCause::SigningKeyUnavailable(e.to_string())))?
            .ok_or_else(|| {
                server_error(PollCause::SigningKeyUnavailable(format!(
                    "no private key for {}",
                    client.public_key_id
                )))
            })?;
        decode_private_key(&private_key)
            .map_err(|e| server_error(PollCause::SigningKeyUnavailable(e.to_string())))?;

        let response = self
            .transport
            .signed_get(SignedGet {
                url: &client.endpoint,
                key_id: &client.public_key_id,
                private_key: &private_key,
                strict_ssl: client.strict_ssl,
            })
            .await
            .map_err(|e| server_error(PollCause::Transport(e)))?;

        if response.status != 200 {
            return Err(server_error(PollCause::Status(response.status))
                .with_response(response.status, response.body));
        }

        serde_json::from_str::<Vec<Message>>(&response.body).map_err(|e| {
            server_error(PollCause::InvalidBody(e.to_string()))
                .with_response(response.status, response.body.clone())
        })
    }
}

#[async_trait]
impl JobHandler for PollEngine {
    async fn run(&self, job: &JobSpec) -> anyhow::Result<()> {
        let outcome = self.poll_once(&job.payload).await?;
        debug!(
            "Poll of client {} finished ({} received)",
            outcome.client_id, outcome.received
        );
        Ok(())
    }
}
