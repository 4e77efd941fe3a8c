//! Client DTOs
//!
//! Request and query shapes for the administrative client operations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::client::ClientConfig;

/// Partial update of a client configuration
///
/// Only the fields listed here can be changed after registration; `None`
/// leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClient {
    /// Client to update; taken from the request path by the admin API
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_id: Option<String>,

    #[serde(
        rename = "strictSSL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub strict_ssl: Option<bool>,
}

impl UpdateClient {
    /// Applies the set fields onto `config`
    pub fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(label) = &self.label {
            config.label = label.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(interval) = self.interval {
            config.interval = Some(interval);
        }
        if let Some(public_key_id) = &self.public_key_id {
            config.public_key_id = public_key_id.clone();
        }
        if let Some(strict_ssl) = self.strict_ssl {
            config.strict_ssl = strict_ssl;
        }
    }

    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.endpoint.is_none()
            && self.interval.is_none()
            && self.public_key_id.is_none()
            && self.strict_ssl.is_none()
    }
}

/// Exact-match filter for listing clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientQuery {
    pub id: Option<String>,
    pub label: Option<String>,
    pub endpoint: Option<String>,
}

impl ClientQuery {
    pub fn matches(&self, config: &ClientConfig) -> bool {
        self.id.as_deref().is_none_or(|id| config.id == id)
            && self.label.as_deref().is_none_or(|l| config.label == l)
            && self.endpoint.as_deref().is_none_or(|e| config.endpoint == e)
    }
}

/// Paging for list operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Projects a client configuration onto the requested wire field names
///
/// An empty field list returns every field. Unknown names are ignored.
pub fn project(config: &ClientConfig, fields: &[String]) -> Value {
    let Ok(Value::Object(all)) = serde_json::to_value(config) else {
        return Value::Null;
    };

    if fields.is_empty() {
        return Value::Object(all);
    }

    let projected: Map<String, Value> = all
        .into_iter()
        .filter(|(key, _)| fields.iter().any(|f| f == key))
        .collect();

    Value::Object(projected)
}
