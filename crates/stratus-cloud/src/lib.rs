//! Stratus Cloud
//!
//! This crate provides the provider-neutral resource lifecycle for Stratus:
//! translating a desired-state record into create / read / update / delete
//! calls against a control-plane API, and mirroring the observed remote
//! record back for drift detection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │        Declarative engine (orchestrator)        │
//! │   owns config diffing and state persistence     │
//! └─────────────────┬───────────────────────────────┘
//!                   │ Tracked<State> / Desired
//! ┌─────────────────▼───────────────────────────────┐
//! │                 stratus-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Reconciler<R>   (plan / reconcile)       │   │
//! │  │  trait Resource { create, read, ... }     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Lifecycle   │  │ poll_until   │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │ metric alarm  │ │    domain     │
//! │  (CloudWatch) │ │ (Route 53 D.) │
//! └───────────────┘ └───────────────┘
//! ```

pub mod action;
pub mod change;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod reconciler;
pub mod resource;
pub mod state;
pub mod wait;

// Re-exports
pub use action::{
    Action, ActionType, ApplyResult, Aspect, AspectFailure, Plan, PlanSummary, UpdateReport,
};
pub use change::{Change, ChangeSet};
pub use error::{CloudError, Result};
pub use lifecycle::{LifecycleEvent, LifecycleState};
pub use logging::{init_logging, try_init_logging};
pub use reconciler::Reconciler;
pub use resource::{Identity, Resource};
pub use state::{Outcome, Tracked};
pub use wait::{PollConfig, PollStatus, poll_until};
