//! Core domain types
//!
//! These types are shared between the daemon (which persists and polls them)
//! and the admin client/CLI (which read and update them).

pub mod client;
pub mod message;
