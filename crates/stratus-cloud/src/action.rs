//! Planned actions and apply reports

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a planned action for a managed entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "metric-alarm", "domain")
    pub resource_type: String,

    /// Identity of the entity the action targets
    pub identity: String,

    /// Description of the action
    pub description: String,

    /// Additional details about the action (changed fields, replacement target)
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        identity: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let identity = identity.into();
        Self {
            id: format!("{}-{}", action_type, identity),
            action_type,
            resource_type: resource_type.into(),
            identity,
            description: description.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new entity
    Create,
    /// Update an existing entity in place
    Update,
    /// Identity changed: delete the old entity, then create the new one
    Replace,
    /// Delete an entity
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// One independently updatable part of a multi-aspect entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aspect(String);

impl Aspect {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Aspect {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

pub use crate::error::AspectFailure;

/// Outcome of an update, aspect by aspect
///
/// Aspects are applied independently. A failure does not roll back aspects
/// that were already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Aspects whose remote call succeeded
    pub succeeded: Vec<Aspect>,

    /// Aspects whose remote call failed
    pub failed: Vec<AspectFailure>,

    /// Aspects left alone because their value did not change
    pub unchanged: Vec<Aspect>,
}

impl UpdateReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether any remote mutation was attempted
    pub fn has_mutations(&self) -> bool {
        !self.succeeded.is_empty() || !self.failed.is_empty()
    }

    pub fn add_success(&mut self, aspect: impl Into<Aspect>) {
        self.succeeded.push(aspect.into());
    }

    pub fn add_failure(&mut self, aspect: impl Into<Aspect>, message: impl std::fmt::Display) {
        self.failed.push(AspectFailure {
            aspect: aspect.into(),
            message: message.to_string(),
        });
    }

    pub fn add_unchanged(&mut self, aspect: impl Into<Aspect>) {
        self.unchanged.push(aspect.into());
    }

    /// Turn a report with failures into a `PartialUpdate` error
    pub fn into_result(self, identity: &str) -> crate::Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(crate::CloudError::PartialUpdate {
                identity: identity.to_string(),
                succeeded: self.succeeded,
                failed: self.failed,
            })
        }
    }
}

/// Result of applying a batch of actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            Action::new(ActionType::Create, "metric-alarm", "cpu-high", "create"),
            Action::new(ActionType::NoOp, "metric-alarm", "disk-full", "unchanged"),
            Action::new(ActionType::Replace, "metric-alarm", "mem-low", "rename"),
        ]);

        assert!(plan.has_changes);
        assert_eq!(
            plan.summary().to_string(),
            "1 to create, 0 to update, 1 to replace, 0 to delete, 1 unchanged"
        );
    }

    #[test]
    fn test_noop_plan_has_no_changes() {
        let plan = Plan::new(vec![Action::new(
            ActionType::NoOp,
            "domain",
            "example.com",
            "unchanged",
        )]);
        assert!(!plan.has_changes);
        assert!(!Plan::new(Vec::new()).has_changes);
    }

    #[test]
    fn test_action_id_includes_type_and_identity() {
        let action = Action::new(ActionType::Delete, "domain", "example.com", "delete");
        assert_eq!(action.id, "delete-example.com");
    }

    #[test]
    fn test_update_report_into_result() {
        let mut report = UpdateReport::new();
        report.add_success("contacts");
        report.add_unchanged("tags");
        assert!(report.has_mutations());
        assert!(report.clone().into_result("example.com").is_ok());

        report.add_failure("nameservers", "throttled");
        let err = report.into_result("example.com").unwrap_err();
        match err {
            crate::CloudError::PartialUpdate {
                succeeded, failed, ..
            } => {
                assert_eq!(succeeded, vec![Aspect::new("contacts")]);
                assert_eq!(failed[0].aspect.as_str(), "nameservers");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_report_has_no_mutations() {
        let mut report = UpdateReport::new();
        report.add_unchanged("contacts");
        assert!(!report.has_mutations());
        assert!(report.is_success());
    }
}
