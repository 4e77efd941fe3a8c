//! API Module
//!
//! Administrative HTTP API of the daemon.

pub mod clients;
pub mod error;
pub mod health;

use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::service::ClientRegistry;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ClientRegistry>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Message client endpoints
        .route("/api/clients", get(clients::list_clients))
        .route(
            "/api/clients/{id}",
            get(clients::get_client).patch(clients::update_client),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
