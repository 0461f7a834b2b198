//! Route 53 registered domain resource
//!
//! Domains are registered outside of this crate; "create" adopts a domain
//! the account already holds and brings it to the desired configuration.
//! Each aspect (contacts, privacy, auto-renew, name servers, transfer
//! lock, tags) has its own API call and is only touched when it differs.
//! Registrar workflows are asynchronous and polled until they finish.

use super::api::{DomainDetail, DomainsApi, OperationStatus};
use super::model::{
    ContactDetail, DomainConfig, DomainState, Nameserver, TagDiff, contact_change,
    has_transfer_lock, name_servers_change, privacy_change,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use stratus_cloud::{
    Change, ChangeSet, CloudError, Identity, PollConfig, PollStatus, Resource, Result,
    UpdateReport, poll_until,
};
use stratus_config::{StratusConfig, Timeouts};

pub const RESOURCE_TYPE: &str = "domain";

const CONTACTS: &str = "contacts";
const PRIVACY: &str = "privacy";
const AUTO_RENEW: &str = "auto_renew";
const NAME_SERVERS: &str = "name_servers";
const TRANSFER_LOCK: &str = "transfer_lock";
const TAGS: &str = "tags";

/// GetDomainDetail plus the domain's tags
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    pub detail: DomainDetail,
    pub tags: BTreeMap<String, String>,
}

/// Route 53 registered domain
///
/// Create and delete are not symmetric. Create only adopts a registration
/// the account already holds, but delete calls `DeleteDomain`, which gives
/// the registration up for good. Remove a domain from management by
/// dropping its tracked record instead of reconciling it to absent.
pub struct DomainResource {
    api: Arc<dyn DomainsApi>,
    poll: PollConfig,
    timeouts: Timeouts,
}

impl DomainResource {
    pub fn new(api: Arc<dyn DomainsApi>) -> Self {
        Self {
            api,
            poll: PollConfig::default(),
            timeouts: Timeouts::default(),
        }
    }

    /// Use the poll and timeout settings from a loaded config
    pub fn from_config(api: Arc<dyn DomainsApi>, config: &StratusConfig) -> Self {
        Self {
            api,
            poll: config.poll.clone(),
            timeouts: config.timeouts.clone(),
        }
    }

    /// Bring every differing aspect of `observed` to `desired`
    ///
    /// Stops at the first failing aspect. If nothing had been applied yet the
    /// aspect's own error is returned; otherwise a `PartialUpdate` naming what
    /// was applied and what failed.
    async fn converge(
        &self,
        domain: &str,
        observed: &DomainState,
        desired: &DomainConfig,
        timeout: Duration,
    ) -> Result<UpdateReport> {
        let current = &observed.config;
        let mut report = UpdateReport::new();

        // Contacts: only the roles that changed are sent
        let admin = changed_contact(&desired.admin_contact, &current.admin_contact);
        let registrant = changed_contact(&desired.registrant_contact, &current.registrant_contact);
        let tech = changed_contact(&desired.tech_contact, &current.tech_contact);
        if admin.is_some() || registrant.is_some() || tech.is_some() {
            let result = self
                .set_contacts(domain, admin, registrant, tech, timeout)
                .await;
            step(&mut report, domain, CONTACTS, result)?;
        } else {
            report.add_unchanged(CONTACTS);
        }

        if privacy_change(desired, current).is_changed() {
            let result = self.set_privacy(domain, desired, timeout).await;
            step(&mut report, domain, PRIVACY, result)?;
        } else {
            report.add_unchanged(PRIVACY);
        }

        if desired.auto_renew != current.auto_renew {
            let result = self.set_auto_renew(domain, desired.auto_renew).await;
            step(&mut report, domain, AUTO_RENEW, result)?;
        } else {
            report.add_unchanged(AUTO_RENEW);
        }

        if name_servers_change(&desired.name_servers, &current.name_servers).is_changed() {
            let result = self
                .set_name_servers(domain, &desired.name_servers, timeout)
                .await;
            step(&mut report, domain, NAME_SERVERS, result)?;
        } else {
            report.add_unchanged(NAME_SERVERS);
        }

        if desired.transfer_lock != current.transfer_lock {
            let result = self
                .set_transfer_lock(domain, desired.transfer_lock, timeout)
                .await;
            step(&mut report, domain, TRANSFER_LOCK, result)?;
        } else {
            report.add_unchanged(TRANSFER_LOCK);
        }

        let tags = TagDiff::between(&current.tags, &desired.tags);
        if !tags.is_empty() {
            let result = self.set_tags(domain, &tags).await;
            step(&mut report, domain, TAGS, result)?;
        } else {
            report.add_unchanged(TAGS);
        }

        Ok(report)
    }

    async fn set_contacts(
        &self,
        domain: &str,
        admin: Option<&ContactDetail>,
        registrant: Option<&ContactDetail>,
        tech: Option<&ContactDetail>,
        timeout: Duration,
    ) -> Result<()> {
        tracing::debug!("Updating contacts for {}", domain);
        let operation_id = self
            .api
            .update_domain_contact(domain, admin, registrant, tech)
            .await
            .map_err(|e| e.into_remote("UpdateDomainContact", domain))?;
        self.wait_for_operation("UpdateDomainContact", domain, operation_id, timeout)
            .await
    }

    async fn set_privacy(&self, domain: &str, desired: &DomainConfig, timeout: Duration) -> Result<()> {
        tracing::debug!("Updating contact privacy for {}", domain);
        let operation_id = self
            .api
            .update_domain_contact_privacy(
                domain,
                desired.admin_privacy,
                desired.registrant_privacy,
                desired.tech_privacy,
            )
            .await
            .map_err(|e| e.into_remote("UpdateDomainContactPrivacy", domain))?;
        self.wait_for_operation("UpdateDomainContactPrivacy", domain, operation_id, timeout)
            .await
    }

    async fn set_auto_renew(&self, domain: &str, enabled: bool) -> Result<()> {
        if enabled {
            tracing::debug!("Enabling auto-renew for {}", domain);
            self.api
                .enable_domain_auto_renew(domain)
                .await
                .map_err(|e| e.into_remote("EnableDomainAutoRenew", domain))
        } else {
            tracing::debug!("Disabling auto-renew for {}", domain);
            self.api
                .disable_domain_auto_renew(domain)
                .await
                .map_err(|e| e.into_remote("DisableDomainAutoRenew", domain))
        }
    }

    async fn set_name_servers(
        &self,
        domain: &str,
        name_servers: &[Nameserver],
        timeout: Duration,
    ) -> Result<()> {
        tracing::debug!("Updating name servers for {}", domain);
        let operation_id = self
            .api
            .update_domain_nameservers(domain, name_servers)
            .await
            .map_err(|e| e.into_remote("UpdateDomainNameservers", domain))?;
        self.wait_for_operation("UpdateDomainNameservers", domain, operation_id, timeout)
            .await
    }

    async fn set_transfer_lock(&self, domain: &str, locked: bool, timeout: Duration) -> Result<()> {
        let (operation, result) = if locked {
            tracing::debug!("Enabling transfer lock for {}", domain);
            (
                "EnableDomainTransferLock",
                self.api.enable_domain_transfer_lock(domain).await,
            )
        } else {
            tracing::debug!("Disabling transfer lock for {}", domain);
            (
                "DisableDomainTransferLock",
                self.api.disable_domain_transfer_lock(domain).await,
            )
        };
        let operation_id = result.map_err(|e| e.into_remote(operation, domain))?;
        self.wait_for_operation(operation, domain, operation_id, timeout)
            .await
    }

    async fn set_tags(&self, domain: &str, diff: &TagDiff) -> Result<()> {
        if !diff.remove.is_empty() {
            tracing::debug!("Removing tags {:?} from {}", diff.remove, domain);
            self.api
                .delete_tags_for_domain(domain, &diff.remove)
                .await
                .map_err(|e| e.into_remote("DeleteTagsForDomain", domain))?;
        }
        if !diff.upsert.is_empty() {
            tracing::debug!("Updating {} tags on {}", diff.upsert.len(), domain);
            self.api
                .update_tags_for_domain(domain, &diff.upsert)
                .await
                .map_err(|e| e.into_remote("UpdateTagsForDomain", domain))?;
        }
        Ok(())
    }

    /// Poll a registrar operation until it succeeds, fails, or times out
    async fn wait_for_operation(
        &self,
        operation: &str,
        domain: &str,
        operation_id: Option<String>,
        timeout: Duration,
    ) -> Result<()> {
        let Some(operation_id) = operation_id else {
            return Ok(());
        };
        tracing::debug!(
            "Waiting for {} on {} (operation {})",
            operation,
            domain,
            operation_id
        );

        poll_until(&self.poll, timeout, operation, domain, || {
            let api = Arc::clone(&self.api);
            let operation_id = operation_id.clone();
            let domain = domain.to_string();
            async move {
                let detail = api
                    .get_operation_detail(&operation_id)
                    .await
                    .map_err(|e| e.into_remote("GetOperationDetail", &domain))?;
                Ok(match detail.status {
                    OperationStatus::Successful => PollStatus::Done(()),
                    OperationStatus::Submitted | OperationStatus::InProgress => {
                        PollStatus::Pending
                    }
                    OperationStatus::Error | OperationStatus::Failed => PollStatus::Failed {
                        status: detail.status.to_string(),
                        message: detail.message.unwrap_or_default(),
                    },
                })
            }
        })
        .await
    }
}

/// Record one aspect's outcome, converting a failure into the error to return
fn step(report: &mut UpdateReport, domain: &str, aspect: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            report.add_success(aspect);
            Ok(())
        }
        Err(e) if report.succeeded.is_empty() => Err(e),
        Err(e) => {
            tracing::warn!("Updating {} of {} failed: {}", aspect, domain, e);
            report.add_failure(aspect, &e);
            report.clone().into_result(domain).map(|_| ())
        }
    }
}

fn changed_contact<'a>(
    desired: &'a Option<ContactDetail>,
    observed: &Option<ContactDetail>,
) -> Option<&'a ContactDetail> {
    match contact_change(desired.as_ref(), observed.as_ref()) {
        Change::Changed => desired.as_ref(),
        Change::Unchanged => None,
    }
}

fn rfc3339(date: &Option<DateTime<Utc>>) -> Option<String> {
    date.map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[async_trait]
impl Resource for DomainResource {
    type Desired = DomainConfig;
    type Remote = DomainRecord;
    type State = DomainState;

    fn resource_type(&self) -> &str {
        RESOURCE_TYPE
    }

    fn identity_of(&self, desired: &DomainConfig) -> Identity {
        Identity::new(desired.domain_name.clone())
    }

    fn validate(&self, desired: &DomainConfig) -> Result<()> {
        desired.validate()
    }

    async fn create(&self, desired: &DomainConfig) -> Result<Identity> {
        let domain = desired.domain_name.as_str();
        let record = self.read(&Identity::new(domain)).await?.ok_or_else(|| {
            CloudError::remote(
                "GetDomainDetail",
                domain,
                "domain is not registered to this account",
            )
        })?;

        tracing::info!("Adopting registered domain {}", domain);
        let observed = self.flatten(&record);
        self.converge(domain, &observed, desired, self.timeouts.create())
            .await?
            .into_result(domain)?;
        Ok(Identity::new(domain))
    }

    async fn read(&self, identity: &Identity) -> Result<Option<DomainRecord>> {
        let domain = identity.as_str();
        let detail = match self.api.get_domain_detail(domain).await {
            Ok(detail) => detail,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into_remote("GetDomainDetail", domain)),
        };
        if detail.domain_name != domain {
            return Ok(None);
        }

        let tags = self
            .api
            .list_tags_for_domain(domain)
            .await
            .map_err(|e| e.into_remote("ListTagsForDomain", domain))?;
        Ok(Some(DomainRecord { detail, tags }))
    }

    fn flatten(&self, remote: &DomainRecord) -> DomainState {
        let detail = &remote.detail;
        DomainState {
            config: DomainConfig {
                domain_name: detail.domain_name.clone(),
                admin_contact: detail.admin_contact.clone(),
                registrant_contact: detail.registrant_contact.clone(),
                tech_contact: detail.tech_contact.clone(),
                admin_privacy: detail.admin_privacy.unwrap_or(false),
                registrant_privacy: detail.registrant_privacy.unwrap_or(false),
                tech_privacy: detail.tech_privacy.unwrap_or(false),
                auto_renew: detail.auto_renew.unwrap_or(false),
                name_servers: detail.nameservers.clone(),
                transfer_lock: has_transfer_lock(&detail.status_list),
                tags: remote.tags.clone(),
            },
            abuse_contact_email: detail.abuse_contact_email.clone(),
            abuse_contact_phone: detail.abuse_contact_phone.clone(),
            creation_date: rfc3339(&detail.creation_date),
            expiration_date: rfc3339(&detail.expiration_date),
            updated_date: rfc3339(&detail.updated_date),
            registrar_name: detail.registrar_name.clone(),
            registrar_url: detail.registrar_url.clone(),
            reseller: detail.reseller.clone(),
            status_list: detail.status_list.clone(),
            whois_server: detail.whois_server.clone(),
        }
    }

    fn diff(&self, prior: &DomainState, desired: &DomainConfig) -> ChangeSet {
        let current = &prior.config;
        let mut changes = ChangeSet::new();
        changes
            .record(
                "admin_contact",
                contact_change(desired.admin_contact.as_ref(), current.admin_contact.as_ref()),
            )
            .record(
                "registrant_contact",
                contact_change(
                    desired.registrant_contact.as_ref(),
                    current.registrant_contact.as_ref(),
                ),
            )
            .record(
                "tech_contact",
                contact_change(desired.tech_contact.as_ref(), current.tech_contact.as_ref()),
            )
            .field("admin_privacy", &current.admin_privacy, &desired.admin_privacy)
            .field(
                "registrant_privacy",
                &current.registrant_privacy,
                &desired.registrant_privacy,
            )
            .field("tech_privacy", &current.tech_privacy, &desired.tech_privacy)
            .field("auto_renew", &current.auto_renew, &desired.auto_renew)
            .record(
                "name_servers",
                name_servers_change(&desired.name_servers, &current.name_servers),
            )
            .field("transfer_lock", &current.transfer_lock, &desired.transfer_lock)
            .field("tags", &current.tags, &desired.tags);
        changes
    }

    async fn update(
        &self,
        identity: &Identity,
        prior: &DomainState,
        desired: &DomainConfig,
    ) -> Result<UpdateReport> {
        self.converge(identity.as_str(), prior, desired, self.timeouts.update())
            .await
    }

    /// Release the registration (not reversible)
    async fn delete(&self, identity: &Identity) -> Result<()> {
        let domain = identity.as_str();
        tracing::warn!("Deleting domain registration {}", domain);
        let operation_id = self
            .api
            .delete_domain(domain)
            .await
            .map_err(|e| e.into_remote("DeleteDomain", domain))?;
        self.wait_for_operation("DeleteDomain", domain, operation_id, self.timeouts.delete())
            .await
    }
}
