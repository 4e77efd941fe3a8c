//! Herald HTTP Client
//!
//! A typed client for the administrative API of the Herald daemon.
//!
//! # Example
//!
//! ```no_run
//! use herald_client::HeraldClient;
//! use herald_core::dto::client::UpdateClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), herald_client::ClientError> {
//!     let client = HeraldClient::new("http://localhost:8080", "admin");
//!
//!     let record = client
//!         .update_client(UpdateClient {
//!             id: "message.test".to_string(),
//!             interval: Some(10),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     println!("Now polling every {:?} minute(s)", record.client.interval);
//!     Ok(())
//! }
//! ```

mod clients;
pub mod error;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header naming the principal performing an administrative call
pub const ACTOR_HEADER: &str = "x-herald-actor";

/// HTTP client for the Herald daemon API
#[derive(Debug, Clone)]
pub struct HeraldClient {
    /// Base URL of the daemon (e.g., "http://localhost:8080")
    base_url: String,
    /// Actor id sent with every administrative request
    actor: String,
    /// HTTP client instance
    client: Client,
}

impl HeraldClient {
    /// Create a new client acting as `actor`
    pub fn new(base_url: impl Into<String>, actor: impl Into<String>) -> Self {
        Self::with_client(base_url, actor, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        actor: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            actor: actor.into(),
            client,
        }
    }

    /// Get the base URL of the daemon
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the daemon is up
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), body));
        }

        Ok(())
    }

    /// Attach the actor header to an administrative request
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(ACTOR_HEADER, &self.actor)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
