//! Service layer
//!
//! Business logic for the daemon. Services orchestrate the repositories,
//! the scheduler adapter and the outbound transport; they hold their
//! collaborators as trait objects so tests can run against in-memory fakes.

pub mod auth;
pub mod escalation;
pub mod events;
pub mod poll;
pub mod registry;
pub mod transform;

pub use auth::{Actor, StaticAuthorizer};
pub use escalation::{EscalationPolicy, EscalationSettings};
pub use events::{EventBus, HeraldEvent};
pub use poll::PollEngine;
pub use registry::ClientRegistry;
pub use transform::TransformPipeline;
