//! Event bus
//!
//! Broadcasts daemon events to any interested subscriber. Delivery to
//! humans (mail, push, ...) is done by subscribers outside this crate.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HeraldEvent {
    /// A client reached its consecutive poll failure threshold
    #[serde(rename_all = "camelCase")]
    PollServerError { client_id: String, endpoint: String },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HeraldEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HeraldEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event
    ///
    /// # Returns
    /// The number of subscribers that received it (zero is fine)
    pub fn emit(&self, event: HeraldEvent) -> usize {
        tracing::debug!("Emitting event {:?}", event);
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
