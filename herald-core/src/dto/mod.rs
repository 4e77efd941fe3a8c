//! Data Transfer Objects for the administrative API
//!
//! DTOs are the request and query shapes exchanged between the admin
//! client and the daemon.

pub mod client;
