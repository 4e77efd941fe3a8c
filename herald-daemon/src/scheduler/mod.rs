//! Scheduler layer
//!
//! `engine` is a small in-process recurring job engine (one ticker task per
//! job, capped concurrency per job id). `adapter` translates message client
//! configurations into jobs on that engine.

pub mod adapter;
pub mod engine;

pub use adapter::{POLL_SERVERS, SchedulerAdapter, job_id};
pub use engine::{JobEngine, JobHandler, JobSpec, Schedule, TokioJobEngine};
