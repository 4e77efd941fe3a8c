//! Repository Module
//!
//! Data access layer for the daemon. Each repository is a trait so the
//! services can be exercised against in-memory fakes; the Postgres
//! implementations live next to their trait.

mod client;
mod key;
mod message;

// Re-export traits
pub use client::ClientRepository;
pub use key::KeyStore;
pub use message::{MessageStore, StoredBatch};

// Re-export implementations
pub use client::PgClientRepository;
pub use key::PgKeyStore;
pub use message::PgMessageStore;
