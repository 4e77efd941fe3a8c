//! Outbound transport layer
//!
//! Issues signed GET requests against remote message endpoints. The
//! signature covers the `date`, `host` and `request-line` headers and is
//! produced with the client's Ed25519 private key.

mod http;
mod signature;

pub use http::{HttpPollTransport, PollTransport, RemoteResponse, SignedGet};
pub use signature::decode_private_key;
