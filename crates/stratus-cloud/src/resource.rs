//! Resource trait definition

use crate::action::UpdateReport;
use crate::change::ChangeSet;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Stable external key of a managed entity (alarm name, domain name)
///
/// Once an entity has been created its identity never changes. A new
/// identity in desired state means a different entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resource abstraction trait
///
/// Each managed resource type (metric alarm, registered domain, ...)
/// implements this trait as a CRUD adapter over its control-plane API.
/// The API client is handed to the implementation at construction; nothing
/// here reaches for global state. [`crate::Reconciler`] drives these
/// operations and enforces the lifecycle around them.
#[async_trait]
pub trait Resource: Send + Sync {
    /// User intent
    type Desired: Clone + std::fmt::Debug + Send + Sync;

    /// The API's representation of the entity
    type Remote: std::fmt::Debug + Send + Sync;

    /// Observed entity flattened into the desired-state shape, computed fields included
    type State: Clone + std::fmt::Debug + Serialize + Send + Sync;

    /// Returns the resource type name (e.g., "metric-alarm", "domain")
    fn resource_type(&self) -> &str;

    /// Identity the desired record will be known by
    fn identity_of(&self, desired: &Self::Desired) -> Identity;

    /// Check cross-field constraints the type system cannot express
    ///
    /// Runs before any remote call.
    fn validate(&self, _desired: &Self::Desired) -> Result<()> {
        Ok(())
    }

    /// Issue the remote create call
    async fn create(&self, desired: &Self::Desired) -> Result<Identity>;

    /// Look the entity up by identity; `None` when it does not exist
    async fn read(&self, identity: &Identity) -> Result<Option<Self::Remote>>;

    /// Map a remote record into the desired-state type system
    fn flatten(&self, remote: &Self::Remote) -> Self::State;

    /// Declared fields that differ between last-known state and desired
    fn diff(&self, prior: &Self::State, desired: &Self::Desired) -> ChangeSet;

    /// Push desired state to the remote entity
    ///
    /// `prior` is the last-known state; implementations must not mutate
    /// anything that already matches it.
    async fn update(
        &self,
        identity: &Identity,
        prior: &Self::State,
        desired: &Self::Desired,
    ) -> Result<UpdateReport>;

    /// Issue the remote delete call
    async fn delete(&self, identity: &Identity) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display_and_serde() {
        let id = Identity::from("cpu-high");
        assert_eq!(id.to_string(), "cpu-high");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cpu-high\"");
        assert!(!id.is_empty());
        assert!(Identity::new("").is_empty());
    }
}
