//! Recurring job engine
//!
//! Runs every scheduled job on its own ticker. A firing only starts if a
//! permit from the job's semaphore is free, so a job whose previous run is
//! still in flight skips that tick. Semaphores are kept per job id across
//! unschedule/schedule, which keeps the cap even while an old run is still
//! finishing after a reschedule.
//!
//! Unscheduling stops the ticker; runs already spawned are left to finish.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Repeat-forever schedule with a fixed period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    minutes: u32,
}

impl Schedule {
    pub fn every_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.minutes) * 60)
    }
}

/// ISO 8601 repeating interval, e.g. `R/PT10M`
impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R/PT{}M", self.minutes)
    }
}

/// A recurring job registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Unique job identity
    pub id: String,

    /// Selects the handler defined for this kind of job
    pub job_type: String,

    pub schedule: Schedule,

    /// Informational; every job currently runs at the same priority
    pub priority: i32,

    /// Maximum number of concurrent runs of this job
    pub concurrency: usize,

    /// Opaque handler argument
    pub payload: String,
}

/// Work performed when a job fires
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, job: &JobSpec) -> anyhow::Result<()>;
}

/// Contract of a recurring job engine
#[async_trait]
pub trait JobEngine: Send + Sync {
    /// Registers a new recurring job
    ///
    /// Fails with `DuplicateJob` if a job with the same id is active.
    async fn schedule(&self, spec: JobSpec) -> Result<(), EngineError>;

    /// Stops future firings of a job
    ///
    /// # Returns
    /// `true` if a job was removed, `false` if none was scheduled
    async fn unschedule(&self, job_id: &str) -> Result<bool, EngineError>;

    /// Returns the active registration for `job_id`, if any
    async fn get_job(&self, job_id: &str) -> Option<JobSpec>;
}

type HandlerMap = Arc<RwLock<HashMap<String, Arc<dyn JobHandler>>>>;

struct ActiveJob {
    spec: JobSpec,
    ticker: JoinHandle<()>,
}

/// Tokio implementation of JobEngine
pub struct TokioJobEngine {
    handlers: HandlerMap,
    jobs: Mutex<HashMap<String, ActiveJob>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    closed: Mutex<bool>,
}

impl TokioJobEngine {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            jobs: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            closed: Mutex::new(false),
        }
    }

    /// Defines the handler run for jobs of `job_type`
    pub async fn define(&self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let job_type = job_type.into();
        debug!("Defining job type {}", job_type);
        self.handlers.write().await.insert(job_type, handler);
    }

    /// Number of active jobs
    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Stops every ticker and refuses further registrations
    pub async fn shutdown(&self) {
        *self.closed.lock().await = true;

        let mut jobs = self.jobs.lock().await;
        for (id, job) in jobs.drain() {
            debug!("Stopping job {}", id);
            job.ticker.abort();
        }

        info!("Job engine stopped");
    }

    async fn gate_for(&self, spec: &JobSpec) -> Arc<Semaphore> {
        let mut gates = self.gates.lock().await;
        gates
            .entry(spec.id.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(spec.concurrency)))
            .clone()
    }

    fn spawn_ticker(spec: JobSpec, gate: Arc<Semaphore>, handlers: HandlerMap) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = spec.schedule.period();
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let Ok(permit) = gate.clone().try_acquire_owned() else {
                    debug!("Job {} still running, skipping this firing", spec.id);
                    continue;
                };

                let handler = handlers.read().await.get(&spec.job_type).cloned();
                let Some(handler) = handler else {
                    warn!("No handler defined for job type {}", spec.job_type);
                    continue;
                };

                let job = spec.clone();
                tokio::spawn(async move {
                    // Permit is released when the run finishes
                    let _permit = permit;
                    if let Err(e) = handler.run(&job).await {
                        warn!("Job {} failed: {:#}", job.id, e);
                    }
                });
            }
        })
    }
}

impl Default for TokioJobEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobEngine for TokioJobEngine {
    async fn schedule(&self, spec: JobSpec) -> Result<(), EngineError> {
        if *self.closed.lock().await {
            return Err(EngineError::Shutdown);
        }

        if spec.schedule.minutes() == 0 {
            return Err(EngineError::InvalidJob {
                id: spec.id,
                reason: "schedule period must be positive".to_string(),
            });
        }

        if spec.concurrency == 0 {
            return Err(EngineError::InvalidJob {
                id: spec.id,
                reason: "concurrency must be positive".to_string(),
            });
        }

        let gate = self.gate_for(&spec).await;

        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&spec.id) {
            return Err(EngineError::DuplicateJob(spec.id));
        }

        debug!("Scheduling job {} ({})", spec.id, spec.schedule);

        let ticker = Self::spawn_ticker(spec.clone(), gate, Arc::clone(&self.handlers));
        jobs.insert(spec.id.clone(), ActiveJob { spec, ticker });

        Ok(())
    }

    async fn unschedule(&self, job_id: &str) -> Result<bool, EngineError> {
        let removed = self.jobs.lock().await.remove(job_id);

        match removed {
            Some(job) => {
                job.ticker.abort();
                debug!("Unscheduled job {}", job_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_job(&self, job_id: &str) -> Option<JobSpec> {
        self.jobs
            .lock()
            .await
            .get(job_id)
            .map(|job| job.spec.clone())
    }
}
