//! Route 53 Domains API surface

use super::model::{ContactDetail, Nameserver};
use crate::error::ApiResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A domain as GetDomainDetail reports it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainDetail {
    pub domain_name: String,
    pub nameservers: Vec<Nameserver>,
    pub auto_renew: Option<bool>,
    pub admin_contact: Option<ContactDetail>,
    pub registrant_contact: Option<ContactDetail>,
    pub tech_contact: Option<ContactDetail>,
    pub admin_privacy: Option<bool>,
    pub registrant_privacy: Option<bool>,
    pub tech_privacy: Option<bool>,
    pub registrar_name: Option<String>,
    pub whois_server: Option<String>,
    pub registrar_url: Option<String>,
    pub abuse_contact_email: Option<String>,
    pub abuse_contact_phone: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub reseller: Option<String>,
    pub status_list: Vec<String>,
}

/// Progress of an asynchronous registrar operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Submitted,
    InProgress,
    Error,
    Successful,
    Failed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Error => "ERROR",
            Self::Successful => "SUCCESSFUL",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDetail {
    pub operation_id: String,
    pub status: OperationStatus,
    pub message: Option<String>,
}

/// Route 53 Domains operations the domain resource needs
///
/// Calls that start a registrar workflow return its operation id, to be
/// polled with [`DomainsApi::get_operation_detail`].
#[async_trait]
pub trait DomainsApi: Send + Sync {
    /// `ApiError::NotFound` when the account does not hold the domain
    async fn get_domain_detail(&self, domain_name: &str) -> ApiResult<DomainDetail>;

    /// Replace the given contacts; `None` leaves that role untouched
    async fn update_domain_contact(
        &self,
        domain_name: &str,
        admin: Option<&ContactDetail>,
        registrant: Option<&ContactDetail>,
        tech: Option<&ContactDetail>,
    ) -> ApiResult<Option<String>>;

    async fn update_domain_contact_privacy(
        &self,
        domain_name: &str,
        admin: bool,
        registrant: bool,
        tech: bool,
    ) -> ApiResult<Option<String>>;

    async fn enable_domain_auto_renew(&self, domain_name: &str) -> ApiResult<()>;

    async fn disable_domain_auto_renew(&self, domain_name: &str) -> ApiResult<()>;

    async fn update_domain_nameservers(
        &self,
        domain_name: &str,
        nameservers: &[Nameserver],
    ) -> ApiResult<Option<String>>;

    async fn enable_domain_transfer_lock(&self, domain_name: &str) -> ApiResult<Option<String>>;

    async fn disable_domain_transfer_lock(&self, domain_name: &str) -> ApiResult<Option<String>>;

    async fn get_operation_detail(&self, operation_id: &str) -> ApiResult<OperationDetail>;

    async fn list_tags_for_domain(&self, domain_name: &str) -> ApiResult<BTreeMap<String, String>>;

    /// Add or overwrite tags
    async fn update_tags_for_domain(
        &self,
        domain_name: &str,
        tags: &BTreeMap<String, String>,
    ) -> ApiResult<()>;

    async fn delete_tags_for_domain(&self, domain_name: &str, keys: &[String]) -> ApiResult<()>;

    async fn delete_domain(&self, domain_name: &str) -> ApiResult<Option<String>>;
}
