//! HTTP request signatures
//!
//! Builds the `Authorization: Signature ...` header for a GET request. The
//! signing string lists `date` and `host` as `name: value` lines followed by
//! the raw request line, joined by newlines.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey};
use url::Url;

use crate::error::TransportError;

/// Headers covered by every poll request signature, in signing order
pub const SIGNED_HEADERS: [&str; 3] = ["date", "host", "request-line"];

const ALGORITHM: &str = "ed25519";

/// A computed request signature and the header values it covers
#[derive(Debug, Clone)]
pub struct HttpSignature {
    pub key_id: String,
    pub date: String,
    pub host: String,
    pub request_line: String,
    /// Base64 encoded signature bytes
    pub signature: String,
}

impl HttpSignature {
    /// Signs a GET request for `url`
    ///
    /// # Arguments
    /// * `url` - Target of the request
    /// * `date` - Value sent in the `Date` header
    /// * `key_id` - Public key id advertised to the server
    /// * `private_key` - Base64 encoded 32 byte Ed25519 seed
    pub fn sign(
        url: &Url,
        date: &str,
        key_id: &str,
        private_key: &str,
    ) -> Result<Self, TransportError> {
        if key_id
            .chars()
            .any(|c| c == '"' || c == '\\' || c.is_control())
        {
            return Err(TransportError::Signing(format!(
                "key id {:?} cannot be quoted in the Authorization header",
                key_id
            )));
        }

        let key = decode_private_key(private_key)?;
        let host = host_header(url)?;
        let request_line = request_line(url);

        let payload = signing_string(date, &host, &request_line);
        let signature = STANDARD.encode(key.sign(payload.as_bytes()).to_bytes());

        Ok(Self {
            key_id: key_id.to_string(),
            date: date.to_string(),
            host,
            request_line,
            signature,
        })
    }

    /// Value of the `Authorization` header
    pub fn authorization(&self) -> String {
        format!(
            "Signature keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            ALGORITHM,
            SIGNED_HEADERS.join(" "),
            self.signature
        )
    }

    /// The exact bytes that were signed
    pub fn signing_string(&self) -> String {
        signing_string(&self.date, &self.host, &self.request_line)
    }
}

/// Formats a timestamp as an HTTP `Date` header value
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn signing_string(date: &str, host: &str, request_line: &str) -> String {
    format!("date: {}\nhost: {}\n{}", date, host, request_line)
}

fn host_header(url: &Url) -> Result<String, TransportError> {
    let host = url
        .host_str()
        .ok_or_else(|| TransportError::InvalidUrl(url.to_string()))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn request_line(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("GET {}?{} HTTP/1.1", url.path(), query),
        None => format!("GET {} HTTP/1.1", url.path()),
    }
}

/// Decodes a base64 32 byte Ed25519 seed
pub fn decode_private_key(encoded: &str) -> Result<SigningKey, TransportError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| TransportError::Signing(format!("private key is not base64: {}", e)))?;

    let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        TransportError::Signing(format!(
            "private key must be 32 bytes, got {}",
            bytes.len()
        ))
    })?;

    Ok(SigningKey::from_bytes(&seed))
}
