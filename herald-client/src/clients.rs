//! Message client endpoints

use herald_core::domain::client::ClientRecord;
use herald_core::dto::client::{ClientQuery, ListOptions, UpdateClient};
use reqwest::Url;
use serde_json::Value;

use crate::HeraldClient;
use crate::error::{ClientError, Result};

impl HeraldClient {
    /// List message clients
    ///
    /// # Arguments
    /// * `query` - Exact-match filter on id, label and endpoint
    /// * `fields` - Wire field names to return (all when empty)
    /// * `options` - Paging
    ///
    /// # Returns
    /// One JSON object per matching client, restricted to `fields`
    pub async fn list_clients(
        &self,
        query: &ClientQuery,
        fields: &[String],
        options: ListOptions,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/api/clients", self.base_url);

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(id) = &query.id {
            params.push(("id", id.clone()));
        }
        if let Some(label) = &query.label {
            params.push(("label", label.clone()));
        }
        if let Some(endpoint) = &query.endpoint {
            params.push(("endpoint", endpoint.clone()));
        }
        if !fields.is_empty() {
            params.push(("fields", fields.join(",")));
        }
        if let Some(limit) = options.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = options.offset {
            params.push(("offset", offset.to_string()));
        }

        let response = self
            .authorized(self.client.get(&url).query(&params))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the full record of a message client
    pub async fn get_client(&self, client_id: &str) -> Result<ClientRecord> {
        let url = self.client_url(client_id)?;
        tracing::debug!("GET {}", url);

        let response = self.authorized(self.client.get(url)).send().await?;

        self.handle_response(response).await
    }

    /// Update a message client; the daemon restarts its poll job
    ///
    /// # Returns
    /// The updated record
    pub async fn update_client(&self, update: UpdateClient) -> Result<ClientRecord> {
        let url = self.client_url(&update.id)?;
        tracing::debug!("PATCH {}", url);

        let response = self
            .authorized(self.client.patch(url).json(&update))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// `/api/clients/{id}` with the id encoded as a single path segment
    fn client_url(&self, client_id: &str) -> Result<Url> {
        let invalid = || ClientError::InvalidUrl(self.base_url.clone());

        let mut url = Url::parse(&format!("{}/api/clients", self.base_url)).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push(client_id);

        Ok(url)
    }
}
