//! Capability checks for administrative operations

use std::collections::HashSet;
use std::fmt;

use crate::error::RegistryError;

/// The principal performing an administrative call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read and modify message client configuration
    AdministerMessageClients,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::AdministerMessageClients => write!(f, "message-client-admin"),
        }
    }
}

pub trait Authorizer: Send + Sync {
    /// Fails with `PermissionDenied` unless `actor` holds `capability`
    fn check(&self, actor: &Actor, capability: Capability) -> Result<(), RegistryError>;
}

/// Grants every capability to a fixed set of actor ids
pub struct StaticAuthorizer {
    admins: HashSet<String>,
}

impl StaticAuthorizer {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }
}

impl Authorizer for StaticAuthorizer {
    fn check(&self, actor: &Actor, capability: Capability) -> Result<(), RegistryError> {
        if self.admins.contains(&actor.id) {
            return Ok(());
        }

        tracing::warn!("Actor {} denied {}", actor.id, capability);

        Err(RegistryError::PermissionDenied {
            actor: actor.id.clone(),
            capability: capability.to_string(),
        })
    }
}
