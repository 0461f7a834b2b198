//! In-memory API clients
//!
//! Stand-ins for CloudWatch and Route 53 Domains that keep their data in
//! process. Every call is recorded by its API operation name, failures can
//! be injected per operation, and registrar operations can be made to
//! finish late, fail, or never finish.

use crate::alarm::api::{CloudWatchApi, MetricAlarm, PutMetricAlarmInput};
use crate::domain::api::{DomainDetail, DomainsApi, OperationDetail, OperationStatus};
use crate::domain::model::{ContactDetail, Nameserver, TRANSFER_LOCK_STATUS};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Call log plus one-shot failure injection, shared by both clients
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, ApiError>>,
}

impl Recorder {
    /// Log the call; return the injected failure if one is pending
    fn enter(&self, operation: &str) -> ApiResult<()> {
        lock(&self.calls).push(operation.to_string());
        match lock(&self.failures).remove(operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn fail_next(&self, operation: &str, error: ApiError) {
        lock(&self.failures).insert(operation.to_string(), error);
    }

    fn clear(&self) {
        lock(&self.calls).clear();
    }
}

fn is_read_only(operation: &str) -> bool {
    operation.starts_with("Describe") || operation.starts_with("Get") || operation.starts_with("List")
}

// ============================================================================
// CloudWatch
// ============================================================================

/// In-memory CloudWatch alarms
pub struct InMemoryCloudWatch {
    region: String,
    account_id: String,
    alarms: Mutex<BTreeMap<String, MetricAlarm>>,
    recorder: Recorder,
}

impl Default for InMemoryCloudWatch {
    fn default() -> Self {
        Self::new("us-east-1", "123456789012")
    }
}

impl InMemoryCloudWatch {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            alarms: Mutex::new(BTreeMap::new()),
            recorder: Recorder::default(),
        }
    }

    /// Operation names of every call so far
    pub fn calls(&self) -> Vec<String> {
        self.recorder.calls()
    }

    /// Number of calls that changed (or tried to change) something
    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| !is_read_only(c)).count()
    }

    pub fn clear_calls(&self) {
        self.recorder.clear();
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: &str, error: ApiError) {
        self.recorder.fail_next(operation, error);
    }

    pub fn alarm(&self, name: &str) -> Option<MetricAlarm> {
        lock(&self.alarms).get(name).cloned()
    }

    /// Store an alarm directly, bypassing the call log
    pub fn insert(&self, alarm: MetricAlarm) {
        lock(&self.alarms).insert(alarm.alarm_name.clone(), alarm);
    }

    /// Delete an alarm behind the caller's back
    pub fn remove(&self, name: &str) -> Option<MetricAlarm> {
        lock(&self.alarms).remove(name)
    }

    fn arn(&self, name: &str) -> String {
        format!(
            "arn:aws:cloudwatch:{}:{}:alarm:{}",
            self.region, self.account_id, name
        )
    }
}

#[async_trait]
impl CloudWatchApi for InMemoryCloudWatch {
    async fn put_metric_alarm(&self, input: PutMetricAlarmInput) -> ApiResult<()> {
        self.recorder.enter("PutMetricAlarm")?;

        if input.statistic.is_some() && input.extended_statistic.is_some() {
            return Err(ApiError::rejected(
                "InvalidParameterCombination",
                "Statistic and ExtendedStatistic are mutually exclusive",
            ));
        }

        let mut alarms = lock(&self.alarms);
        let state_value = alarms
            .get(&input.alarm_name)
            .and_then(|a| a.state_value.clone())
            .unwrap_or_else(|| "INSUFFICIENT_DATA".to_string());

        let alarm = MetricAlarm {
            alarm_arn: Some(self.arn(&input.alarm_name)),
            comparison_operator: Some(input.comparison_operator),
            evaluation_periods: Some(input.evaluation_periods),
            threshold: Some(input.threshold),
            actions_enabled: Some(input.actions_enabled.unwrap_or(true)),
            alarm_actions: input.alarm_actions,
            ok_actions: input.ok_actions,
            insufficient_data_actions: input.insufficient_data_actions,
            alarm_description: input.alarm_description,
            datapoints_to_alarm: input.datapoints_to_alarm,
            metric_name: input.metric_name,
            namespace: input.namespace,
            period: input.period,
            statistic: input.statistic,
            extended_statistic: input.extended_statistic,
            dimensions: input.dimensions,
            metrics: input.metrics,
            unit: input.unit,
            treat_missing_data: Some(
                input
                    .treat_missing_data
                    .unwrap_or_else(|| "missing".to_string()),
            ),
            evaluate_low_sample_count_percentile: input.evaluate_low_sample_count_percentile,
            state_value: Some(state_value),
            alarm_name: input.alarm_name,
        };
        alarms.insert(alarm.alarm_name.clone(), alarm);
        Ok(())
    }

    /// Matches by prefix, so longer names sharing a prefix come back too
    async fn describe_alarms(&self, alarm_names: &[String]) -> ApiResult<Vec<MetricAlarm>> {
        self.recorder.enter("DescribeAlarms")?;

        Ok(lock(&self.alarms)
            .values()
            .filter(|alarm| {
                alarm_names
                    .iter()
                    .any(|name| alarm.alarm_name.starts_with(name.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn delete_alarms(&self, alarm_names: &[String]) -> ApiResult<()> {
        self.recorder.enter("DeleteAlarms")?;

        let mut alarms = lock(&self.alarms);
        for name in alarm_names {
            alarms.remove(name);
        }
        Ok(())
    }
}

// ============================================================================
// Route 53 Domains
// ============================================================================

/// How registrar operations started from now on will complete
#[derive(Debug, Clone, PartialEq)]
pub enum OperationBehavior {
    /// Successful on the first status check
    Immediate,
    /// In progress for this many checks, then successful
    CompleteAfter(u32),
    /// In progress forever
    Never,
    /// Finishes with status FAILED and this message
    Fail(String),
}

#[derive(Debug, Clone)]
struct ScriptedOperation {
    behavior: OperationBehavior,
    checks: u32,
}

struct DomainEntry {
    detail: DomainDetail,
    tags: BTreeMap<String, String>,
}

/// In-memory Route 53 Domains registrar
pub struct InMemoryDomains {
    domains: Mutex<BTreeMap<String, DomainEntry>>,
    operations: Mutex<HashMap<String, ScriptedOperation>>,
    behavior: Mutex<OperationBehavior>,
    next_operation: AtomicU64,
    recorder: Recorder,
}

impl Default for InMemoryDomains {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDomains {
    pub fn new() -> Self {
        Self {
            domains: Mutex::new(BTreeMap::new()),
            operations: Mutex::new(HashMap::new()),
            behavior: Mutex::new(OperationBehavior::Immediate),
            next_operation: AtomicU64::new(1),
            recorder: Recorder::default(),
        }
    }

    /// A freshly registered domain: privacy off, auto-renew off, unlocked
    pub fn registered(domain_name: &str) -> DomainDetail {
        let now = Utc::now();
        DomainDetail {
            domain_name: domain_name.to_string(),
            nameservers: vec![
                Nameserver::new("ns-1.awsdns-01.org"),
                Nameserver::new("ns-2.awsdns-02.com"),
            ],
            auto_renew: Some(false),
            admin_privacy: Some(false),
            registrant_privacy: Some(false),
            tech_privacy: Some(false),
            registrar_name: Some("Amazon Registrar, Inc.".to_string()),
            registrar_url: Some("http://registrar.amazon.com".to_string()),
            whois_server: Some("whois.registrar.amazon.com".to_string()),
            abuse_contact_email: Some("abuse@amazonaws.com".to_string()),
            abuse_contact_phone: Some("+1.2024422253".to_string()),
            creation_date: Some(now),
            updated_date: Some(now),
            expiration_date: Some(now + ChronoDuration::days(365)),
            status_list: vec!["ok".to_string()],
            ..Default::default()
        }
    }

    /// Hold a domain in the account
    pub fn register(&self, detail: DomainDetail) {
        lock(&self.domains).insert(
            detail.domain_name.clone(),
            DomainEntry {
                detail,
                tags: BTreeMap::new(),
            },
        );
    }

    pub fn detail(&self, domain_name: &str) -> Option<DomainDetail> {
        lock(&self.domains)
            .get(domain_name)
            .map(|entry| entry.detail.clone())
    }

    pub fn tags(&self, domain_name: &str) -> BTreeMap<String, String> {
        lock(&self.domains)
            .get(domain_name)
            .map(|entry| entry.tags.clone())
            .unwrap_or_default()
    }

    /// Completion behavior for operations started after this call
    pub fn set_operation_behavior(&self, behavior: OperationBehavior) {
        *lock(&self.behavior) = behavior;
    }

    pub fn calls(&self) -> Vec<String> {
        self.recorder.calls()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| !is_read_only(c)).count()
    }

    pub fn clear_calls(&self) {
        self.recorder.clear();
    }

    pub fn fail_next(&self, operation: &str, error: ApiError) {
        self.recorder.fail_next(operation, error);
    }

    fn start_operation(&self) -> Option<String> {
        let id = format!(
            "op-{:08}",
            self.next_operation.fetch_add(1, Ordering::SeqCst)
        );
        let behavior = lock(&self.behavior).clone();
        lock(&self.operations).insert(
            id.clone(),
            ScriptedOperation {
                behavior,
                checks: 0,
            },
        );
        Some(id)
    }

    /// Apply `change` to a held domain
    fn modify(
        &self,
        domain_name: &str,
        change: impl FnOnce(&mut DomainEntry),
    ) -> ApiResult<()> {
        let mut domains = lock(&self.domains);
        let entry = domains
            .get_mut(domain_name)
            .ok_or_else(|| ApiError::NotFound(domain_name.to_string()))?;
        change(entry);
        entry.detail.updated_date = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl DomainsApi for InMemoryDomains {
    async fn get_domain_detail(&self, domain_name: &str) -> ApiResult<DomainDetail> {
        self.recorder.enter("GetDomainDetail")?;
        self.detail(domain_name)
            .ok_or_else(|| ApiError::NotFound(domain_name.to_string()))
    }

    async fn update_domain_contact(
        &self,
        domain_name: &str,
        admin: Option<&ContactDetail>,
        registrant: Option<&ContactDetail>,
        tech: Option<&ContactDetail>,
    ) -> ApiResult<Option<String>> {
        self.recorder.enter("UpdateDomainContact")?;
        self.modify(domain_name, |entry| {
            if let Some(admin) = admin {
                entry.detail.admin_contact = Some(admin.clone());
            }
            if let Some(registrant) = registrant {
                entry.detail.registrant_contact = Some(registrant.clone());
            }
            if let Some(tech) = tech {
                entry.detail.tech_contact = Some(tech.clone());
            }
        })?;
        Ok(self.start_operation())
    }

    async fn update_domain_contact_privacy(
        &self,
        domain_name: &str,
        admin: bool,
        registrant: bool,
        tech: bool,
    ) -> ApiResult<Option<String>> {
        self.recorder.enter("UpdateDomainContactPrivacy")?;
        self.modify(domain_name, |entry| {
            entry.detail.admin_privacy = Some(admin);
            entry.detail.registrant_privacy = Some(registrant);
            entry.detail.tech_privacy = Some(tech);
        })?;
        Ok(self.start_operation())
    }

    async fn enable_domain_auto_renew(&self, domain_name: &str) -> ApiResult<()> {
        self.recorder.enter("EnableDomainAutoRenew")?;
        self.modify(domain_name, |entry| entry.detail.auto_renew = Some(true))
    }

    async fn disable_domain_auto_renew(&self, domain_name: &str) -> ApiResult<()> {
        self.recorder.enter("DisableDomainAutoRenew")?;
        self.modify(domain_name, |entry| entry.detail.auto_renew = Some(false))
    }

    async fn update_domain_nameservers(
        &self,
        domain_name: &str,
        nameservers: &[Nameserver],
    ) -> ApiResult<Option<String>> {
        self.recorder.enter("UpdateDomainNameservers")?;
        self.modify(domain_name, |entry| {
            entry.detail.nameservers = nameservers.to_vec()
        })?;
        Ok(self.start_operation())
    }

    async fn enable_domain_transfer_lock(&self, domain_name: &str) -> ApiResult<Option<String>> {
        self.recorder.enter("EnableDomainTransferLock")?;
        self.modify(domain_name, |entry| {
            let status = &mut entry.detail.status_list;
            if !status.iter().any(|s| s == TRANSFER_LOCK_STATUS) {
                status.push(TRANSFER_LOCK_STATUS.to_string());
            }
        })?;
        Ok(self.start_operation())
    }

    async fn disable_domain_transfer_lock(&self, domain_name: &str) -> ApiResult<Option<String>> {
        self.recorder.enter("DisableDomainTransferLock")?;
        self.modify(domain_name, |entry| {
            entry
                .detail
                .status_list
                .retain(|s| s != TRANSFER_LOCK_STATUS)
        })?;
        Ok(self.start_operation())
    }

    async fn get_operation_detail(&self, operation_id: &str) -> ApiResult<OperationDetail> {
        self.recorder.enter("GetOperationDetail")?;

        let mut operations = lock(&self.operations);
        let operation = operations
            .get_mut(operation_id)
            .ok_or_else(|| ApiError::NotFound(operation_id.to_string()))?;
        operation.checks += 1;

        let (status, message) = match &operation.behavior {
            OperationBehavior::Immediate => (OperationStatus::Successful, None),
            OperationBehavior::CompleteAfter(n) if operation.checks <= *n => {
                (OperationStatus::InProgress, None)
            }
            OperationBehavior::CompleteAfter(_) => (OperationStatus::Successful, None),
            OperationBehavior::Never => (OperationStatus::InProgress, None),
            OperationBehavior::Fail(message) => (OperationStatus::Failed, Some(message.clone())),
        };
        Ok(OperationDetail {
            operation_id: operation_id.to_string(),
            status,
            message,
        })
    }

    async fn list_tags_for_domain(&self, domain_name: &str) -> ApiResult<BTreeMap<String, String>> {
        self.recorder.enter("ListTagsForDomain")?;
        lock(&self.domains)
            .get(domain_name)
            .map(|entry| entry.tags.clone())
            .ok_or_else(|| ApiError::NotFound(domain_name.to_string()))
    }

    async fn update_tags_for_domain(
        &self,
        domain_name: &str,
        tags: &BTreeMap<String, String>,
    ) -> ApiResult<()> {
        self.recorder.enter("UpdateTagsForDomain")?;
        let mut domains = lock(&self.domains);
        let entry = domains
            .get_mut(domain_name)
            .ok_or_else(|| ApiError::NotFound(domain_name.to_string()))?;
        entry
            .tags
            .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn delete_tags_for_domain(&self, domain_name: &str, keys: &[String]) -> ApiResult<()> {
        self.recorder.enter("DeleteTagsForDomain")?;
        let mut domains = lock(&self.domains);
        let entry = domains
            .get_mut(domain_name)
            .ok_or_else(|| ApiError::NotFound(domain_name.to_string()))?;
        for key in keys {
            entry.tags.remove(key);
        }
        Ok(())
    }

    async fn delete_domain(&self, domain_name: &str) -> ApiResult<Option<String>> {
        self.recorder.enter("DeleteDomain")?;
        lock(&self.domains)
            .remove(domain_name)
            .ok_or_else(|| ApiError::NotFound(domain_name.to_string()))?;
        Ok(self.start_operation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_describe_alarms_returns_prefix_matches() {
        let cw = InMemoryCloudWatch::default();
        for name in ["cpu-high", "cpu-high-2"] {
            cw.insert(MetricAlarm {
                alarm_name: name.to_string(),
                ..Default::default()
            });
        }

        let found = cw.describe_alarms(&["cpu-high".to_string()]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(cw.calls(), vec!["DescribeAlarms"]);
        assert_eq!(cw.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let cw = InMemoryCloudWatch::default();
        cw.fail_next("DeleteAlarms", ApiError::Transport("reset".to_string()));

        assert!(cw.delete_alarms(&["a".to_string()]).await.is_err());
        assert!(cw.delete_alarms(&["a".to_string()]).await.is_ok());
        assert_eq!(cw.mutation_count(), 2);
    }

    #[tokio::test]
    async fn test_operation_behavior() {
        let domains = InMemoryDomains::new();
        domains.register(InMemoryDomains::registered("example.com"));
        domains.set_operation_behavior(OperationBehavior::CompleteAfter(1));

        let id = domains
            .enable_domain_transfer_lock("example.com")
            .await
            .unwrap()
            .unwrap();
        let first = domains.get_operation_detail(&id).await.unwrap();
        assert_eq!(first.status, OperationStatus::InProgress);
        let second = domains.get_operation_detail(&id).await.unwrap();
        assert_eq!(second.status, OperationStatus::Successful);

        let detail = domains.detail("example.com").unwrap();
        assert!(detail.status_list.contains(&TRANSFER_LOCK_STATUS.to_string()));
    }

    #[tokio::test]
    async fn test_unknown_domain_not_found() {
        let domains = InMemoryDomains::new();
        let err = domains.get_domain_detail("missing.com").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
