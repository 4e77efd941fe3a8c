//! Signed HTTP transport
//!
//! Sends one signed GET per poll and hands back the raw status and body.
//! Classifying the response is left to the poll engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, DATE, HOST};
use url::Url;

use super::signature::{HttpSignature, http_date};
use crate::error::TransportError;

/// Everything needed to issue one signed poll request
#[derive(Debug, Clone)]
pub struct SignedGet<'a> {
    pub url: &'a str,
    pub key_id: &'a str,
    pub private_key: &'a str,
    pub strict_ssl: bool,
}

/// Raw response of a poll request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

/// Transport trait for signed GET requests
#[async_trait]
pub trait PollTransport: Send + Sync {
    /// Issues a signed GET and returns the response, whatever its status
    async fn signed_get(&self, request: SignedGet<'_>) -> Result<RemoteResponse, TransportError>;
}

/// reqwest implementation of PollTransport
///
/// Holds one client that validates TLS certificates and one that does not,
/// selected per request by `strict_ssl`.
pub struct HttpPollTransport {
    strict: Client,
    lenient: Client,
}

impl HttpPollTransport {
    /// Creates a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let strict = Client::builder().timeout(timeout).build()?;
        let lenient = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self { strict, lenient })
    }

    fn client(&self, strict_ssl: bool) -> &Client {
        if strict_ssl {
            &self.strict
        } else {
            &self.lenient
        }
    }
}

#[async_trait]
impl PollTransport for HttpPollTransport {
    async fn signed_get(&self, request: SignedGet<'_>) -> Result<RemoteResponse, TransportError> {
        let url =
            Url::parse(request.url).map_err(|_| TransportError::InvalidUrl(request.url.to_string()))?;

        let date = http_date(chrono::Utc::now());
        let signature = HttpSignature::sign(&url, &date, request.key_id, request.private_key)?;

        tracing::debug!("GET {} (keyId {})", url, request.key_id);

        let response = self
            .client(request.strict_ssl)
            .get(url)
            .header(DATE, &signature.date)
            .header(HOST, &signature.host)
            .header(AUTHORIZATION, signature.authorization())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RemoteResponse { status, body })
    }
}
