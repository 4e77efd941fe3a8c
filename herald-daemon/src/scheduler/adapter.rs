//! Scheduler adapter
//!
//! Maps a message client onto exactly one recurring poll job. Starting a
//! client always removes its previous job first, so restarts and interval
//! changes leave a single active job.

use std::sync::Arc;

use herald_core::domain::client::ClientConfig;
use tracing::{debug, info};

use super::engine::{JobEngine, JobSpec, Schedule};
use crate::error::SchedulerError;

/// Job type handled by the poll engine
pub const POLL_SERVERS: &str = "herald.jobs.PollServers";

/// Deterministic job id for a client
pub fn job_id(client_id: &str) -> String {
    format!("{}.{}", POLL_SERVERS, client_id)
}

pub struct SchedulerAdapter {
    engine: Arc<dyn JobEngine>,
}

impl SchedulerAdapter {
    pub fn new(engine: Arc<dyn JobEngine>) -> Self {
        Self { engine }
    }

    /// (Re)starts polling for a client
    ///
    /// # Returns
    /// The id of the registered job
    pub async fn start(&self, client: &ClientConfig) -> Result<String, SchedulerError> {
        if client.id.trim().is_empty() {
            return Err(SchedulerError::SchedulingFailure {
                reason: "client id is required".to_string(),
            });
        }

        let interval = match client.interval {
            Some(minutes) if minutes > 0 => minutes,
            _ => {
                return Err(SchedulerError::SchedulingFailure {
                    reason: format!("client {} has no polling interval", client.id),
                });
            }
        };

        let id = job_id(&client.id);

        self.engine
            .unschedule(&id)
            .await
            .map_err(|e| SchedulerError::UnschedulingFailure {
                job_id: id.clone(),
                reason: e.to_string(),
            })?;

        let spec = JobSpec {
            id: id.clone(),
            job_type: POLL_SERVERS.to_string(),
            schedule: Schedule::every_minutes(interval),
            priority: 0,
            concurrency: 1,
            payload: client.id.clone(),
        };

        self.engine
            .schedule(spec)
            .await
            .map_err(|e| SchedulerError::SchedulingFailure {
                reason: e.to_string(),
            })?;

        info!(
            "Scheduled polling of client {} every {} minute(s)",
            client.id, interval
        );

        Ok(id)
    }

    /// Stops future polls of a client; an in-flight poll is not interrupted
    ///
    /// # Returns
    /// `true` if a job was active
    pub async fn stop(&self, client_id: &str) -> Result<bool, SchedulerError> {
        let id = job_id(client_id);

        let removed = self
            .engine
            .unschedule(&id)
            .await
            .map_err(|e| SchedulerError::UnschedulingFailure {
                job_id: id.clone(),
                reason: e.to_string(),
            })?;

        debug!("Stopped polling of client {} (job active: {})", client_id, removed);

        Ok(removed)
    }

    /// Starts every client in order, stopping at the first failure
    pub async fn start_all<'a, I>(&self, clients: I) -> Result<usize, SchedulerError>
    where
        I: IntoIterator<Item = &'a ClientConfig>,
    {
        let mut started = 0;
        for client in clients {
            self.start(client).await?;
            started += 1;
        }
        Ok(started)
    }

    /// Active job registration for a client, if any
    #[cfg(test)]
    pub async fn job_for(&self, client_id: &str) -> Option<JobSpec> {
        self.engine.get_job(&job_id(client_id)).await
    }
}
