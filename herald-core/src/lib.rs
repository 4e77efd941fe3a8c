//! Herald Core
//!
//! Core types shared by the Herald message-polling services.
//!
//! This crate contains:
//! - Domain types: remote message-source clients, their persisted records and messages
//! - DTOs: request and query shapes for the administrative API

pub mod domain;
pub mod dto;
