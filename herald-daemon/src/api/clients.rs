//! Message Client API Handlers
//!
//! Administrative endpoints over the client registry. The acting principal
//! is named by the `x-herald-actor` header.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use herald_core::domain::client::ClientRecord;
use herald_core::dto::client::{ClientQuery, ListOptions, UpdateClient};
use serde::Deserialize;
use serde_json::Value;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::Actor;

/// Header carrying the acting principal
pub const ACTOR_HEADER: &str = "x-herald-actor";

/// Query string of GET /api/clients
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub id: Option<String>,
    pub label: Option<String>,
    pub endpoint: Option<String>,

    /// Comma separated wire field names
    pub fields: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListParams {
    fn fields(&self) -> Vec<String> {
        self.fields
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn actor(headers: &HeaderMap) -> ApiResult<Actor> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(Actor::new)
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", ACTOR_HEADER)))
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Value>>> {
    let actor = actor(&headers)?;
    tracing::debug!("Listing message clients for {}", actor.id);

    let fields = params.fields();
    let query = ClientQuery {
        id: params.id,
        label: params.label,
        endpoint: params.endpoint,
    };
    let options = ListOptions {
        limit: params.limit,
        offset: params.offset,
    };

    let clients = state
        .registry
        .list(&actor, &query, &fields, options)
        .await?;

    Ok(Json(clients))
}

/// GET /api/clients/{id}
pub async fn get_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<ClientRecord>> {
    let actor = actor(&headers)?;
    let record = state.registry.get(&actor, &id).await?;
    Ok(Json(record))
}

/// PATCH /api/clients/{id}
pub async fn update_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut update): Json<UpdateClient>,
) -> ApiResult<Json<ClientRecord>> {
    let actor = actor(&headers)?;
    tracing::info!("Updating message client {} for {}", id, actor.id);

    update.id = id;
    let record = state.registry.update(&actor, update).await?;

    Ok(Json(record))
}
