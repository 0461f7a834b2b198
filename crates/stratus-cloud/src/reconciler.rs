//! Reconcile-by-diff driver
//!
//! [`Reconciler`] wraps one [`Resource`] implementation and runs the
//! create / read / update / delete lifecycle around it:
//!
//! - validation always happens before the first remote call
//! - create and update are always followed by a fresh read
//! - a read that finds nothing means "drop the local record", except right
//!   after a create or update, where it is an error
//! - delete of something already gone succeeds
//! - nothing is cached between operations

use crate::action::{Action, ActionType, ApplyResult, Plan, UpdateReport};
use crate::error::{CloudError, Result};
use crate::lifecycle::{LifecycleEvent, LifecycleState};
use crate::resource::{Identity, Resource};
use crate::state::{Outcome, Tracked};
use std::time::Instant;

/// Drives a resource's lifecycle operations
pub struct Reconciler<R> {
    resource: R,
}

impl<R: Resource> Reconciler<R> {
    pub fn new(resource: R) -> Self {
        Self { resource }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    fn resource_type(&self) -> &str {
        self.resource.resource_type()
    }

    fn track(&self, identity: Identity, remote: &R::Remote) -> Tracked<R::State> {
        Tracked::new(identity, self.resource_type(), self.resource.flatten(remote))
    }

    fn check_identity(&self, desired: &R::Desired) -> Result<Identity> {
        let identity = self.resource.identity_of(desired);
        if identity.is_empty() {
            return Err(CloudError::validation(
                "<unnamed>",
                format!("{} identity must not be empty", self.resource_type()),
            ));
        }
        Ok(identity)
    }

    /// Decide what to do with an entity, given its last-known state and desired state
    pub fn plan(
        &self,
        tracked: Option<&Tracked<R::State>>,
        desired: Option<&R::Desired>,
    ) -> Action {
        let resource_type = self.resource_type();

        match (tracked, desired) {
            (None, None) => Action::new(ActionType::NoOp, resource_type, "", "nothing to manage"),
            (None, Some(desired)) => {
                let identity = self.resource.identity_of(desired);
                Action::new(
                    ActionType::Create,
                    resource_type,
                    identity.as_str(),
                    format!("Create {} {}", resource_type, identity),
                )
            }
            (Some(tracked), None) => Action::new(
                ActionType::Delete,
                resource_type,
                tracked.identity.as_str(),
                format!("Delete {} {}", resource_type, tracked.identity),
            ),
            (Some(tracked), Some(desired)) => {
                let identity = self.resource.identity_of(desired);
                if identity != tracked.identity {
                    return Action::new(
                        ActionType::Replace,
                        resource_type,
                        identity.as_str(),
                        format!(
                            "Replace {} {} with {}",
                            resource_type, tracked.identity, identity
                        ),
                    )
                    .with_detail("replaces", serde_json::json!(tracked.identity.as_str()));
                }

                let changes = self.resource.diff(&tracked.state, desired);
                if changes.is_empty() {
                    Action::new(
                        ActionType::NoOp,
                        resource_type,
                        identity.as_str(),
                        format!("{} {} is up to date", resource_type, identity),
                    )
                } else {
                    Action::new(
                        ActionType::Update,
                        resource_type,
                        identity.as_str(),
                        format!(
                            "Update {} {} ({})",
                            resource_type,
                            identity,
                            changes.fields().join(", ")
                        ),
                    )
                    .with_detail("changed", serde_json::json!(changes.fields()))
                }
            }
        }
    }

    /// Plan a batch of entities without touching anything
    pub fn plan_all(&self, items: &[(Option<Tracked<R::State>>, Option<R::Desired>)]) -> Plan {
        Plan::new(
            items
                .iter()
                .map(|(tracked, desired)| self.plan(tracked.as_ref(), desired.as_ref()))
                .collect(),
        )
    }

    /// Create the entity, then read it back to populate computed fields
    pub async fn create(&self, desired: &R::Desired) -> Result<Tracked<R::State>> {
        let identity = self.check_identity(desired)?;
        self.resource.validate(desired)?;

        let state = LifecycleState::Absent.transition(LifecycleEvent::BeginCreate)?;
        tracing::info!("Creating {}: {}", self.resource_type(), identity);

        let created = match self.resource.create(desired).await {
            Ok(created) => created,
            Err(e) => {
                state.transition(LifecycleEvent::Failed)?;
                tracing::warn!("Creating {} {} failed: {}", self.resource_type(), identity, e);
                return Err(e);
            }
        };

        match self.resource.read(&created).await {
            Ok(Some(remote)) => {
                let mut tracked = self.track(created, &remote);
                tracked.lifecycle = state.transition(LifecycleEvent::Succeeded)?;
                tracing::info!("{} {} created", self.resource_type(), tracked.identity);
                Ok(tracked)
            }
            Ok(None) => {
                state.transition(LifecycleEvent::Failed)?;
                Err(CloudError::remote(
                    "Read",
                    created.as_str(),
                    format!("{} not found after create", self.resource_type()),
                ))
            }
            Err(e) => {
                state.transition(LifecycleEvent::Failed)?;
                Err(e)
            }
        }
    }

    /// Read the entity by identity; `None` when it no longer exists
    pub async fn read(&self, identity: &Identity) -> Result<Option<Tracked<R::State>>> {
        tracing::debug!("Reading {}: {}", self.resource_type(), identity);

        match self.resource.read(identity).await? {
            Some(remote) => Ok(Some(self.track(identity.clone(), &remote))),
            None => Ok(None),
        }
    }

    /// Re-read a tracked entity
    pub async fn refresh(&self, tracked: &Tracked<R::State>) -> Result<Outcome<R::State>> {
        match self.read(&tracked.identity).await? {
            Some(fresh) => Ok(Outcome::Present(fresh)),
            None => {
                tracked.lifecycle.transition(LifecycleEvent::Vanished)?;
                tracing::warn!(
                    "{} {} not found, removing from state",
                    self.resource_type(),
                    tracked.identity
                );
                Ok(Outcome::Absent)
            }
        }
    }

    /// Start tracking an entity that already exists remotely
    pub async fn import(&self, identity: &Identity) -> Result<Tracked<R::State>> {
        tracing::info!("Importing {}: {}", self.resource_type(), identity);

        self.read(identity).await?.ok_or_else(|| {
            CloudError::remote(
                "Import",
                identity.as_str(),
                format!("{} not found", self.resource_type()),
            )
        })
    }

    /// Push desired state onto a tracked entity, then read it back
    pub async fn update(
        &self,
        tracked: &Tracked<R::State>,
        desired: &R::Desired,
    ) -> Result<(Tracked<R::State>, UpdateReport)> {
        let identity = self.check_identity(desired)?;
        if identity != tracked.identity {
            return Err(CloudError::validation(
                tracked.identity.as_str(),
                format!(
                    "identity cannot change in place (requested {}); plan a replacement",
                    identity
                ),
            ));
        }
        self.resource.validate(desired)?;

        let state = tracked.lifecycle.transition(LifecycleEvent::BeginUpdate)?;
        tracing::info!("Updating {}: {}", self.resource_type(), identity);

        let report = match self
            .resource
            .update(&identity, &tracked.state, desired)
            .await
            .and_then(|report| report.into_result(identity.as_str()))
        {
            Ok(report) => report,
            Err(e) => {
                state.transition(LifecycleEvent::Failed)?;
                tracing::warn!("Updating {} {} failed: {}", self.resource_type(), identity, e);
                return Err(e);
            }
        };

        let remote = self.resource.read(&identity).await?.ok_or_else(|| {
            CloudError::remote(
                "Read",
                identity.as_str(),
                format!("{} disappeared during update", self.resource_type()),
            )
        })?;

        let mut fresh = self.track(identity, &remote);
        fresh.lifecycle = state.transition(LifecycleEvent::Succeeded)?;
        if report.has_mutations() {
            tracing::info!("{} {} updated", self.resource_type(), fresh.identity);
        } else {
            tracing::debug!("{} {} already up to date", self.resource_type(), fresh.identity);
        }
        Ok((fresh, report))
    }

    /// Delete the entity; succeeds when it is already gone
    pub async fn delete(&self, identity: &Identity) -> Result<()> {
        if self.resource.read(identity).await?.is_none() {
            tracing::debug!("{} {} is already gone", self.resource_type(), identity);
            return Ok(());
        }

        let state = LifecycleState::Present.transition(LifecycleEvent::BeginDelete)?;
        tracing::info!("Deleting {}: {}", self.resource_type(), identity);

        match self.resource.delete(identity).await {
            Ok(()) => {
                state.transition(LifecycleEvent::Succeeded)?;
                tracing::info!("{} {} deleted", self.resource_type(), identity);
                Ok(())
            }
            Err(e) => {
                state.transition(LifecycleEvent::Failed)?;
                Err(e)
            }
        }
    }

    /// Converge one entity: refresh the prior snapshot, plan, execute
    ///
    /// `tracked` is the last snapshot the orchestrator holds (if any),
    /// `desired` the current configuration (`None` when it was removed).
    pub async fn reconcile(
        &self,
        tracked: Option<Tracked<R::State>>,
        desired: Option<&R::Desired>,
    ) -> Result<Outcome<R::State>> {
        let current = match tracked {
            Some(tracked) => self.refresh(&tracked).await?.into_tracked(),
            None => None,
        };

        let action = self.plan(current.as_ref(), desired);
        tracing::debug!("Planned {}: {}", action.action_type, action.description);

        match (current, desired) {
            (None, None) => Ok(Outcome::Absent),
            (None, Some(desired)) => Ok(Outcome::Present(self.create(desired).await?)),
            (Some(current), None) => {
                self.delete(&current.identity).await?;
                Ok(Outcome::Absent)
            }
            (Some(current), Some(desired)) => match action.action_type {
                ActionType::Replace => {
                    // Nothing is deleted for a replacement that would fail validation
                    self.check_identity(desired)?;
                    self.resource.validate(desired)?;
                    self.delete(&current.identity).await?;
                    Ok(Outcome::Present(self.create(desired).await?))
                }
                ActionType::Update => {
                    let (fresh, _report) = self.update(&current, desired).await?;
                    Ok(Outcome::Present(fresh))
                }
                _ => Ok(Outcome::Present(current)),
            },
        }
    }

    /// Reconcile several entities one after another
    ///
    /// Entities are independent: a failure is recorded and the previous
    /// snapshot kept, and the remaining entities are still reconciled.
    pub async fn reconcile_all(
        &self,
        items: Vec<(Option<Tracked<R::State>>, Option<R::Desired>)>,
    ) -> (Vec<Outcome<R::State>>, ApplyResult) {
        let start = Instant::now();
        let plan = self.plan_all(&items);
        tracing::info!("Plan for {}: {}", self.resource_type(), plan.summary());

        let mut result = ApplyResult::new();
        let mut outcomes = Vec::with_capacity(items.len());

        for ((tracked, desired), action) in items.into_iter().zip(plan.actions) {
            let fallback = match &tracked {
                Some(t) => Outcome::Present(t.clone()),
                None => Outcome::Absent,
            };

            match self.reconcile(tracked, desired.as_ref()).await {
                Ok(outcome) => {
                    result.add_success(action.id.clone(), action.description.clone());
                    outcomes.push(outcome);
                }
                Err(e) => {
                    tracing::warn!("{} failed: {}", action.id, e);
                    result.add_failure(action.id.clone(), e.to_string());
                    outcomes.push(fallback);
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        (outcomes, result)
    }
}
