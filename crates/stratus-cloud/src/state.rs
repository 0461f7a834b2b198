//! Observed state of managed entities
//!
//! A [`Tracked`] value is what the reconciler hands back to the surrounding
//! orchestration after every operation. Persisting it is the orchestrator's
//! job.

use crate::lifecycle::LifecycleState;
use crate::resource::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known state of one managed entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracked<S> {
    /// Lookup key for subsequent operations
    pub identity: Identity,

    /// Resource type
    pub resource_type: String,

    /// Observed record, flattened into the desired-state shape
    pub state: S,

    /// Lifecycle state (always stable once returned to a caller)
    pub lifecycle: LifecycleState,

    /// When the record was last read from the remote API
    pub refreshed_at: DateTime<Utc>,
}

impl<S> Tracked<S> {
    pub fn new(identity: Identity, resource_type: impl Into<String>, state: S) -> Self {
        Self {
            identity,
            resource_type: resource_type.into(),
            state,
            lifecycle: LifecycleState::Present,
            refreshed_at: Utc::now(),
        }
    }

    /// Full resource key (type:identity)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.identity)
    }
}

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<S> {
    /// The entity exists; here is its refreshed state
    Present(Tracked<S>),
    /// The entity does not exist; drop any local record of it
    Absent,
}

impl<S> Outcome<S> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn tracked(&self) -> Option<&Tracked<S>> {
        match self {
            Self::Present(tracked) => Some(tracked),
            Self::Absent => None,
        }
    }

    pub fn into_tracked(self) -> Option<Tracked<S>> {
        match self {
            Self::Present(tracked) => Some(tracked),
            Self::Absent => None,
        }
    }
}
