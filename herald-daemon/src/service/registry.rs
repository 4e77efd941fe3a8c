//! Client registry
//!
//! Administrative operations on message clients. Every read and update is
//! gated on the message client admin capability; registration is an
//! internal startup operation and is not.

use std::sync::Arc;

use chrono::Utc;
use herald_core::domain::client::{ClientConfig, ClientRecord};
use herald_core::dto::client::{ClientQuery, ListOptions, UpdateClient, project};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::error::RegistryError;
use crate::repository::ClientRepository;
use crate::scheduler::SchedulerAdapter;
use crate::service::auth::{Actor, Authorizer, Capability};

pub struct ClientRegistry {
    repository: Arc<dyn ClientRepository>,
    scheduler: Arc<SchedulerAdapter>,
    authorizer: Arc<dyn Authorizer>,
}

impl ClientRegistry {
    pub fn new(
        repository: Arc<dyn ClientRepository>,
        scheduler: Arc<SchedulerAdapter>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            repository,
            scheduler,
            authorizer,
        }
    }

    /// Persists a client configuration unless one with the same id exists
    ///
    /// # Returns
    /// `true` if a record was created, `false` if the id was already known
    /// (the stored record is left as is)
    pub async fn register(&self, client: ClientConfig) -> Result<bool, RegistryError> {
        if client.id.trim().is_empty() {
            return Err(RegistryError::Validation(
                "Message client id is required".to_string(),
            ));
        }

        let id = client.id.clone();
        let created = self
            .repository
            .insert_if_absent(ClientRecord::new(client, Utc::now()))
            .await?;

        if created {
            info!("Registered message client {}", id);
        } else {
            info!("Message client {} already registered", id);
        }

        Ok(created)
    }

    /// Lists client configurations projected onto `fields`
    pub async fn list(
        &self,
        actor: &Actor,
        query: &ClientQuery,
        fields: &[String],
        options: ListOptions,
    ) -> Result<Vec<Value>, RegistryError> {
        self.authorizer
            .check(actor, Capability::AdministerMessageClients)?;

        let records = self.repository.list(query, options).await?;

        Ok(records
            .iter()
            .map(|record| project(&record.client, fields))
            .collect())
    }

    pub async fn get(&self, actor: &Actor, client_id: &str) -> Result<ClientRecord, RegistryError> {
        self.authorizer
            .check(actor, Capability::AdministerMessageClients)?;

        self.repository
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(client_id.to_string()))
    }

    /// Applies a partial update and restarts the client's poll job
    pub async fn update(
        &self,
        actor: &Actor,
        update: UpdateClient,
    ) -> Result<ClientRecord, RegistryError> {
        self.authorizer
            .check(actor, Capability::AdministerMessageClients)?;

        validate_update(&update)?;

        let record = self
            .repository
            .update_config(&update)
            .await?
            .ok_or_else(|| RegistryError::NotFound(update.id.clone()))?;

        if has_interval(&record.client) {
            self.scheduler.start(&record.client).await?;
        } else {
            warn!(
                "Message client {} has no polling interval, not rescheduling",
                record.client.id
            );
        }

        info!("Updated message client {} by {}", update.id, actor.id);

        Ok(record)
    }

    /// Starts a poll job for every persisted client
    ///
    /// Clients without an interval are skipped; any other scheduling
    /// failure aborts the restore.
    pub async fn restore_schedules(&self) -> Result<usize, RegistryError> {
        let records = self
            .repository
            .list(&ClientQuery::default(), ListOptions::default())
            .await?;

        let (schedulable, manual): (Vec<_>, Vec<_>) = records
            .iter()
            .map(|record| &record.client)
            .partition(|client| has_interval(client));

        for client in &manual {
            warn!(
                "Message client {} has no polling interval, not scheduling",
                client.id
            );
        }

        let started = self.scheduler.start_all(schedulable).await?;

        info!("Restored {} of {} message client schedules", started, records.len());

        Ok(started)
    }
}

fn has_interval(client: &ClientConfig) -> bool {
    client.interval.is_some_and(|minutes| minutes > 0)
}

fn validate_update(update: &UpdateClient) -> Result<(), RegistryError> {
    if update.id.trim().is_empty() {
        return Err(RegistryError::Validation(
            "Message client id is required".to_string(),
        ));
    }

    if update.interval == Some(0) {
        return Err(RegistryError::Validation(
            "interval must be a positive number of minutes".to_string(),
        ));
    }

    if let Some(endpoint) = &update.endpoint {
        Url::parse(endpoint).map_err(|_| {
            RegistryError::Validation(format!("endpoint is not a valid URL: {}", endpoint))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TokioJobEngine;
    use crate::service::auth::StaticAuthorizer;
    use crate::testing::{MemoryClientRepository, client_config};

    struct Fixture {
        repository: Arc<MemoryClientRepository>,
        engine: Arc<TokioJobEngine>,
        scheduler: Arc<SchedulerAdapter>,
        registry: ClientRegistry,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(MemoryClientRepository::new());
        let engine = Arc::new(TokioJobEngine::new());
        let scheduler = Arc::new(SchedulerAdapter::new(engine.clone()));
        let registry = ClientRegistry::new(
            repository.clone(),
            scheduler.clone(),
            Arc::new(StaticAuthorizer::new(["admin"])),
        );

        Fixture {
            repository,
            engine,
            scheduler,
            registry,
        }
    }

    fn admin() -> Actor {
        Actor::new("admin")
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_ignored() {
        let fx = fixture();

        assert!(fx.registry.register(client_config("a", 1)).await.unwrap());

        let mut changed = client_config("a", 5);
        changed.label = "Changed".to_string();
        assert!(!fx.registry.register(changed).await.unwrap());

        assert_eq!(fx.repository.len().await, 1);
        let record = fx.registry.get(&admin(), "a").await.unwrap();
        assert_eq!(record.client.interval, Some(1));
        assert_eq!(record.meta.recent_poll_error_count, 0);
        assert_eq!(record.meta.created, record.meta.updated);
    }

    #[tokio::test]
    async fn test_register_requires_id() {
        let fx = fixture();
        let err = fx.registry.register(client_config("", 1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert_eq!(fx.repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_client_is_not_found() {
        let fx = fixture();
        fx.registry.register(client_config("a", 1)).await.unwrap();
        fx.scheduler.start(&client_config("a", 1)).await.unwrap();

        let err = fx
            .registry
            .update(
                &admin(),
                UpdateClient {
                    id: "missing".to_string(),
                    interval: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RegistryError::NotFound(_)));
        assert_eq!(fx.engine.job_count().await, 1);
        assert!(fx.scheduler.job_for("missing").await.is_none());
        let job = fx.scheduler.job_for("a").await.unwrap();
        assert_eq!(job.schedule.to_string(), "R/PT1M");

        fx.engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_reschedules_with_new_interval() {
        let fx = fixture();
        fx.registry.register(client_config("a", 1)).await.unwrap();

        let record = fx
            .registry
            .update(
                &admin(),
                UpdateClient {
                    id: "a".to_string(),
                    interval: Some(10),
                    label: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.client.interval, Some(10));
        assert_eq!(record.client.label, "Renamed");

        let job = fx.scheduler.job_for("a").await.unwrap();
        assert_eq!(job.schedule.to_string(), "R/PT10M");
        assert_eq!(fx.engine.job_count().await, 1);

        fx.engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_validates_fields() {
        let fx = fixture();
        fx.registry.register(client_config("a", 1)).await.unwrap();

        let bad_interval = UpdateClient {
            id: "a".to_string(),
            interval: Some(0),
            ..Default::default()
        };
        let err = fx.registry.update(&admin(), bad_interval).await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));

        let bad_endpoint = UpdateClient {
            id: "a".to_string(),
            endpoint: Some("invalidUrl".to_string()),
            ..Default::default()
        };
        let err = fx.registry.update(&admin(), bad_endpoint).await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));

        assert_eq!(fx.engine.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_operations_require_capability() {
        let fx = fixture();
        fx.registry.register(client_config("a", 1)).await.unwrap();
        let mallory = Actor::new("mallory");

        let err = fx.registry.get(&mallory, "a").await.unwrap_err();
        assert!(matches!(err, RegistryError::PermissionDenied { .. }));

        let err = fx
            .registry
            .list(&mallory, &ClientQuery::default(), &[], ListOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::PermissionDenied { .. }));

        let err = fx
            .registry
            .update(
                &mallory,
                UpdateClient {
                    id: "a".to_string(),
                    interval: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::PermissionDenied { .. }));
        assert_eq!(fx.engine.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_filters_and_projects() {
        let fx = fixture();
        for id in ["a", "b", "c"] {
            fx.registry.register(client_config(id, 1)).await.unwrap();
        }

        let fields = vec!["id".to_string(), "strictSSL".to_string()];
        let all = fx
            .registry
            .list(&admin(), &ClientQuery::default(), &fields, ListOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], serde_json::json!({"id": "a", "strictSSL": false}));

        let query = ClientQuery {
            id: Some("b".to_string()),
            ..Default::default()
        };
        let one = fx
            .registry
            .list(&admin(), &query, &[], ListOptions::default())
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0]["endpoint"], "https://alpha.example.com/messages?state=new");

        let paged = fx
            .registry
            .list(
                &admin(),
                &ClientQuery::default(),
                &fields,
                ListOptions {
                    limit: Some(1),
                    offset: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(paged, vec![serde_json::json!({"id": "b", "strictSSL": false})]);
    }

    #[tokio::test]
    async fn test_restore_schedules_skips_clients_without_interval() {
        let fx = fixture();
        fx.registry.register(client_config("a", 1)).await.unwrap();
        fx.registry.register(client_config("b", 5)).await.unwrap();

        let mut manual = client_config("c", 1);
        manual.interval = None;
        fx.registry.register(manual).await.unwrap();

        assert_eq!(fx.registry.restore_schedules().await.unwrap(), 2);
        assert!(fx.scheduler.job_for("a").await.is_some());
        assert!(fx.scheduler.job_for("c").await.is_none());

        fx.engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_update_without_interval_keeps_record_unscheduled() {
        let fx = fixture();
        let mut manual = client_config("m", 1);
        manual.interval = None;
        fx.registry.register(manual).await.unwrap();

        let record = fx
            .registry
            .update(
                &admin(),
                UpdateClient {
                    id: "m".to_string(),
                    label: Some("Manual".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.client.label, "Manual");
        assert_eq!(record.client.interval, None);
        let stored = fx.registry.get(&admin(), "m").await.unwrap();
        assert_eq!(stored.client.label, "Manual");
        assert!(fx.scheduler.job_for("m").await.is_none());
        assert_eq!(fx.engine.job_count().await, 0);
    }
}
