//! Failure escalation policy
//!
//! Counts consecutive poll failures per client in the registry record.
//! Crossing the configured threshold emits one `poll-server-error` event
//! and, when enabled, pauses the client by unscheduling its job.
//!
//! The read-increment-write on the counter is a single-record update and
//! needs no locking: a client's job never runs two polls at once.

use std::sync::Arc;

use herald_core::domain::client::ClientConfig;
use tracing::{info, warn};

use crate::error::PollError;
use crate::repository::ClientRepository;
use crate::scheduler::SchedulerAdapter;
use crate::service::events::{EventBus, HeraldEvent};

/// Escalation thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationSettings {
    pub max_poll_errors_before_notify: u32,
    pub stop_polling_after_notify: bool,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            max_poll_errors_before_notify: 3,
            stop_polling_after_notify: true,
        }
    }
}

pub struct EscalationPolicy {
    repository: Arc<dyn ClientRepository>,
    scheduler: Arc<SchedulerAdapter>,
    events: EventBus,
    settings: EscalationSettings,
}

impl EscalationPolicy {
    pub fn new(
        repository: Arc<dyn ClientRepository>,
        scheduler: Arc<SchedulerAdapter>,
        events: EventBus,
        settings: EscalationSettings,
    ) -> Self {
        Self {
            repository,
            scheduler,
            events,
            settings,
        }
    }

    /// Records a failed poll
    ///
    /// # Arguments
    /// * `client` - Configuration the poll ran with
    /// * `current_count` - Failure count read at the start of the poll
    /// * `error` - The poll failure
    ///
    /// # Returns
    /// The error to report for this firing: the poll failure itself, or the
    /// bookkeeping failure if the counter could not be maintained.
    pub async fn record_failure(
        &self,
        client: &ClientConfig,
        current_count: u32,
        error: PollError,
    ) -> PollError {
        let count = match self.repository.increment_error_count(&client.id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    "Failed to record poll error for client {}: {}",
                    client.id, e
                );
                return PollError::Bookkeeping(e);
            }
        };

        warn!(
            "Poll of client {} failed ({} -> {} recent errors): {}",
            client.id, current_count, count, error
        );

        if count != self.settings.max_poll_errors_before_notify {
            return error;
        }

        self.events.emit(HeraldEvent::PollServerError {
            client_id: client.id.clone(),
            endpoint: client.endpoint.clone(),
        });

        if !self.settings.stop_polling_after_notify {
            return error;
        }

        if let Err(e) = self.scheduler.stop(&client.id).await {
            return PollError::Scheduling(e);
        }

        if let Err(e) = self.repository.reset_error_count(&client.id).await {
            return PollError::Bookkeeping(e);
        }

        info!(
            "Stopped polling client {} after {} consecutive errors",
            client.id, count
        );

        error
    }

    /// Records a successful poll
    pub async fn record_success(&self, client_id: &str) -> Result<(), PollError> {
        self.repository
            .reset_error_count(client_id)
            .await
            .map_err(PollError::Bookkeeping)
    }
}
