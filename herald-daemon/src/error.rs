//! Error types for the daemon
//!
//! Each layer has its own error enum; poll-cycle errors never escape the job
//! engine, registry and scheduling errors go back to their caller.

use std::fmt;

use thiserror::Error;

/// Persistence failures (registry, key store, message store)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record {0} not found")]
    RecordMissing(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures raised by the recurring job engine itself
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} is already scheduled")]
    DuplicateJob(String),

    #[error("invalid job {id}: {reason}")]
    InvalidJob { id: String, reason: String },

    #[error("job engine is shut down")]
    Shutdown,
}

/// Job registration problems surfaced by the scheduler adapter
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Could not schedule message client job: {reason}")]
    SchedulingFailure { reason: String },

    #[error("Could not unschedule message client job {job_id}: {reason}")]
    UnschedulingFailure { job_id: String, reason: String },
}

/// Why the remote endpoint could not be polled
#[derive(Debug, Error)]
pub enum PollCause {
    #[error("signing key unavailable: {0}")]
    SigningKeyUnavailable(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("response body is not a message array: {0}")]
    InvalidBody(String),
}

/// Any failure while contacting a client's remote endpoint
#[derive(Debug)]
pub struct PollServerError {
    pub endpoint: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub cause: PollCause,
}

impl PollServerError {
    pub fn new(endpoint: impl Into<String>, cause: PollCause) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: None,
            body: None,
            cause,
        }
    }

    pub fn with_response(mut self, status: u16, body: impl Into<String>) -> Self {
        self.status = Some(status);
        let body = body.into();
        if !body.is_empty() {
            self.body = Some(body);
        }
        self
    }
}

impl fmt::Display for PollServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The server could not be contacted (endpoint: {}",
            self.endpoint
        )?;
        if let Some(status) = self.status {
            write!(f, ", status: {}", status)?;
        }
        write!(f, "): {}", self.cause)
    }
}

impl std::error::Error for PollServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Outcome of a failed poll cycle, as reported to the job engine
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Server(#[from] PollServerError),

    #[error("message client {0} not found")]
    UnknownClient(String),

    #[error("failed to store polled messages: {0}")]
    Store(#[source] StorageError),

    /// The failure counter could not be updated; takes precedence over the
    /// poll error that triggered it.
    #[error("failed to record poll outcome: {0}")]
    Bookkeeping(#[source] StorageError),

    #[error(transparent)]
    Scheduling(#[from] SchedulerError),
}

/// Signed HTTP transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid URI \"{0}\"")]
    InvalidUrl(String),

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Administrative registry failures
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Message client {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("actor {actor} lacks capability {capability}")]
    PermissionDenied { actor: String, capability: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scheduling(#[from] SchedulerError),
}
