//! Lifecycle state machine for a managed entity
//!
//! ```text
//! Absent ──BeginCreate──▶ Creating ──Succeeded──▶ Present
//!   ▲                        │ Failed                │ BeginUpdate
//!   │                        ▼                       ▼
//!   ├──────────────────── Absent         Present ◀── Updating
//!   │                                       │      (Succeeded / Failed)
//!   │ Succeeded                             │ BeginDelete
//!   └──────────────── Deleting ◀────────────┘
//!                        │ Failed ──▶ Present
//! ```
//!
//! `Present` and `Absent` are the stable states. A transient state always
//! resolves back to a stable one, whichever way the remote call went.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a managed entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl LifecycleState {
    /// Whether this state is stable (observable between operations)
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Absent | Self::Present)
    }

    /// Apply an event, returning the next state
    pub fn transition(self, event: LifecycleEvent) -> Result<Self> {
        use LifecycleEvent::*;
        use LifecycleState::*;

        match (self, event) {
            (Absent, BeginCreate) => Ok(Creating),
            (Creating, Succeeded) => Ok(Present),
            (Creating, Failed) => Ok(Absent),

            (Present, BeginUpdate) => Ok(Updating),
            (Updating, Succeeded) | (Updating, Failed) => Ok(Present),

            (Present, BeginDelete) => Ok(Deleting),
            (Deleting, Succeeded) => Ok(Absent),
            (Deleting, Failed) => Ok(Present),

            // Observed gone on read
            (Present, Vanished) => Ok(Absent),

            (state, event) => Err(CloudError::InvalidTransition { state, event }),
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Absent => write!(f, "absent"),
            LifecycleState::Creating => write!(f, "creating"),
            LifecycleState::Present => write!(f, "present"),
            LifecycleState::Updating => write!(f, "updating"),
            LifecycleState::Deleting => write!(f, "deleting"),
        }
    }
}

/// Lifecycle event (state machine input)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    BeginCreate,
    BeginUpdate,
    BeginDelete,
    /// The in-flight remote operation completed
    Succeeded,
    /// The in-flight remote operation failed
    Failed,
    /// A read found the entity gone
    Vanished,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::BeginCreate => write!(f, "begin-create"),
            LifecycleEvent::BeginUpdate => write!(f, "begin-update"),
            LifecycleEvent::BeginDelete => write!(f, "begin-delete"),
            LifecycleEvent::Succeeded => write!(f, "succeeded"),
            LifecycleEvent::Failed => write!(f, "failed"),
            LifecycleEvent::Vanished => write!(f, "vanished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent::*;
    use LifecycleState::*;

    #[test]
    fn test_full_lifecycle() {
        let mut state = Absent;
        for event in [
            BeginCreate,
            Succeeded,
            BeginUpdate,
            Succeeded,
            BeginDelete,
            Succeeded,
        ] {
            state = state.transition(event).unwrap();
        }
        assert_eq!(state, Absent);
    }

    #[test]
    fn test_failures_return_to_stable_state() {
        assert_eq!(Absent.transition(BeginCreate).unwrap().transition(Failed).unwrap(), Absent);
        assert_eq!(Present.transition(BeginUpdate).unwrap().transition(Failed).unwrap(), Present);
        assert_eq!(Present.transition(BeginDelete).unwrap().transition(Failed).unwrap(), Present);
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(matches!(
            Absent.transition(BeginUpdate),
            Err(CloudError::InvalidTransition {
                state: Absent,
                event: BeginUpdate
            })
        ));
        assert!(Present.transition(BeginCreate).is_err());
        assert!(Creating.transition(BeginDelete).is_err());
        assert!(Absent.transition(Vanished).is_err());
    }

    #[test]
    fn test_stable_states() {
        assert!(Absent.is_stable());
        assert!(Present.is_stable());
        assert!(!Creating.is_stable());
        assert!(!Updating.is_stable());
        assert!(!Deleting.is_stable());
    }
}
