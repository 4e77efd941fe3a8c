//! Configuration module
//!
//! Handles CLI configuration: where the daemon lives and who is asking.

use herald_client::HeraldClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the daemon
    pub daemon_url: String,

    /// Actor id presented to the daemon
    pub actor: String,
}

impl Config {
    pub fn client(&self) -> HeraldClient {
        HeraldClient::new(&self.daemon_url, &self.actor)
    }
}
