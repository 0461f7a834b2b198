//! Reconciler error types

use crate::action::Aspect;
use crate::lifecycle::{LifecycleEvent, LifecycleState};
use std::time::Duration;
use thiserror::Error;

/// Reconciler errors
///
/// Every variant that can come out of a lifecycle operation carries the
/// identity of the entity and, for remote failures, the attempted operation.
#[derive(Error, Debug)]
pub enum CloudError {
    /// A cross-field constraint was violated; no remote call was made.
    #[error("Invalid configuration for {identity}: {message}")]
    Validation { identity: String, message: String },

    /// The remote API rejected or failed a call.
    #[error("{operation} failed for {identity}: {message}")]
    Remote {
        operation: String,
        identity: String,
        message: String,
    },

    /// Some aspects of a multi-aspect update were applied, others were not.
    #[error(
        "Partial update of {identity}: succeeded [{}], failed [{}]",
        join_aspects(.succeeded),
        join_failures(.failed)
    )]
    PartialUpdate {
        identity: String,
        succeeded: Vec<Aspect>,
        failed: Vec<AspectFailure>,
    },

    /// A polled long-running operation did not finish in time.
    #[error("Timeout: {operation} for {identity} did not complete within {waited:?}")]
    Timeout {
        operation: String,
        identity: String,
        waited: Duration,
    },

    /// A polled long-running operation finished with a failure status.
    #[error("{operation} for {identity} finished with status {status}: {message}")]
    OperationFailed {
        operation: String,
        identity: String,
        status: String,
        message: String,
    },

    #[error("Invalid lifecycle transition: {event} while {state}")]
    InvalidTransition {
        state: LifecycleState,
        event: LifecycleEvent,
    },
}

/// A single aspect that failed during a partial update
#[derive(Debug, Clone, PartialEq)]
pub struct AspectFailure {
    pub aspect: Aspect,
    pub message: String,
}

fn join_aspects(aspects: &[Aspect]) -> String {
    aspects
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_failures(failures: &[AspectFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.aspect, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl CloudError {
    pub fn validation(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            identity: identity.into(),
            message: message.into(),
        }
    }

    pub fn remote(
        operation: impl Into<String>,
        identity: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Remote {
            operation: operation.into(),
            identity: identity.into(),
            message: message.to_string(),
        }
    }

    /// Whether the caller can fix this by correcting its input
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Identity of the entity the error refers to, if any
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Validation { identity, .. }
            | Self::Remote { identity, .. }
            | Self::PartialUpdate { identity, .. }
            | Self::Timeout { identity, .. }
            | Self::OperationFailed { identity, .. } => Some(identity),
            Self::InvalidTransition { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_carries_context() {
        let err = CloudError::remote("PutMetricAlarm", "cpu-high", "throttled");
        assert_eq!(err.to_string(), "PutMetricAlarm failed for cpu-high: throttled");
        assert_eq!(err.identity(), Some("cpu-high"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_partial_update_lists_aspects() {
        let err = CloudError::PartialUpdate {
            identity: "example.com".to_string(),
            succeeded: vec![Aspect::new("contacts"), Aspect::new("auto_renew")],
            failed: vec![AspectFailure {
                aspect: Aspect::new("nameservers"),
                message: "rejected".to_string(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.contains("succeeded [contacts, auto_renew]"));
        assert!(msg.contains("failed [nameservers (rejected)]"));
    }
}
