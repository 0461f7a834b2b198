//! Registered domain records

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use stratus_cloud::{Change, ChangeSet, CloudError, Result};

/// Status code reported while the registrar refuses transfers
pub const TRANSFER_LOCK_STATUS: &str = "clientTransferProhibited";

pub const MAX_NAME_SERVERS: usize = 6;
pub const MAX_GLUE_IPS: usize = 2;

/// Contact information for one domain role
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetail {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact_type: Option<String>,
    pub organization_name: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country_code: Option<String>,
    pub zip_code: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub extra_params: BTreeMap<String, String>,
}

impl ContactDetail {
    /// Fields that differ from `other`
    pub fn compare(&self, other: &ContactDetail) -> ChangeSet {
        let mut changes = ChangeSet::new();
        changes
            .field("first_name", &self.first_name, &other.first_name)
            .field("last_name", &self.last_name, &other.last_name)
            .field("contact_type", &self.contact_type, &other.contact_type)
            .field(
                "organization_name",
                &self.organization_name,
                &other.organization_name,
            )
            .field("address_line_1", &self.address_line_1, &other.address_line_1)
            .field("address_line_2", &self.address_line_2, &other.address_line_2)
            .field("city", &self.city, &other.city)
            .field("state", &self.state, &other.state)
            .field("country_code", &self.country_code, &other.country_code)
            .field("zip_code", &self.zip_code, &other.zip_code)
            .field("phone_number", &self.phone_number, &other.phone_number)
            .field("email", &self.email, &other.email)
            .field("fax", &self.fax, &other.fax)
            .field("extra_params", &self.extra_params, &other.extra_params);
        changes
    }
}

/// One name server, with glue addresses when it lives inside the domain
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Nameserver {
    pub name: String,
    #[serde(default)]
    pub glue_ips: BTreeSet<String>,
}

impl Nameserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            glue_ips: BTreeSet::new(),
        }
    }

    pub fn with_glue_ip(mut self, ip: impl Into<String>) -> Self {
        self.glue_ips.insert(ip.into());
        self
    }
}

fn default_true() -> bool {
    true
}

/// Desired configuration of a registered domain
///
/// Contacts and name servers are optional: when omitted, whatever the
/// registrar currently has is left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub domain_name: String,

    #[serde(default)]
    pub admin_contact: Option<ContactDetail>,
    #[serde(default)]
    pub registrant_contact: Option<ContactDetail>,
    #[serde(default)]
    pub tech_contact: Option<ContactDetail>,

    #[serde(default = "default_true")]
    pub admin_privacy: bool,
    #[serde(default = "default_true")]
    pub registrant_privacy: bool,
    #[serde(default = "default_true")]
    pub tech_privacy: bool,

    #[serde(default = "default_true")]
    pub auto_renew: bool,

    #[serde(default)]
    pub name_servers: Vec<Nameserver>,

    #[serde(default = "default_true")]
    pub transfer_lock: bool,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl DomainConfig {
    /// Domain with every setting at its default
    pub fn new(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            admin_contact: None,
            registrant_contact: None,
            tech_contact: None,
            admin_privacy: true,
            registrant_privacy: true,
            tech_privacy: true,
            auto_renew: true,
            name_servers: Vec::new(),
            transfer_lock: true,
            tags: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| -> Result<()> {
            Err(CloudError::validation(&self.domain_name, message))
        };

        if self.domain_name.is_empty() {
            return Err(CloudError::validation(
                "<unnamed>",
                "domain_name must not be empty",
            ));
        }
        if self.name_servers.len() > MAX_NAME_SERVERS {
            return invalid(format!(
                "at most {} name servers are allowed (got {})",
                MAX_NAME_SERVERS,
                self.name_servers.len()
            ));
        }
        for ns in &self.name_servers {
            if ns.name.is_empty() {
                return invalid("name server name must not be empty".to_string());
            }
            if ns.glue_ips.len() > MAX_GLUE_IPS {
                return invalid(format!(
                    "name server {} has {} glue IPs (at most {})",
                    ns.name,
                    ns.glue_ips.len(),
                    MAX_GLUE_IPS
                ));
            }
            if let Some(ip) = ns
                .glue_ips
                .iter()
                .find(|ip| ip.parse::<std::net::IpAddr>().is_err())
            {
                return invalid(format!(
                    "name server {} glue IP {:?} is not an IP address",
                    ns.name, ip
                ));
            }
        }
        Ok(())
    }
}

/// Observed domain: the declared shape plus registrar-computed attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainState {
    #[serde(flatten)]
    pub config: DomainConfig,

    pub abuse_contact_email: Option<String>,
    pub abuse_contact_phone: Option<String>,
    /// RFC 3339
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
    pub updated_date: Option<String>,
    pub registrar_name: Option<String>,
    pub registrar_url: Option<String>,
    pub reseller: Option<String>,
    pub status_list: Vec<String>,
    pub whois_server: Option<String>,
}

pub fn has_transfer_lock(status_list: &[String]) -> bool {
    status_list.iter().any(|s| s == TRANSFER_LOCK_STATUS)
}

/// A declared contact differs from the observed one
///
/// Undeclared contacts never count as changed.
pub fn contact_change(desired: Option<&ContactDetail>, observed: Option<&ContactDetail>) -> Change {
    match (desired, observed) {
        (None, _) => Change::Unchanged,
        (Some(_), None) => Change::Changed,
        (Some(desired), Some(observed)) => observed.compare(desired).change(),
    }
}

/// Declared name servers differ from the observed list
///
/// Order is significant. An empty declaration leaves the registrar's list alone.
pub fn name_servers_change(desired: &[Nameserver], observed: &[Nameserver]) -> Change {
    if desired.is_empty() {
        return Change::Unchanged;
    }
    Change::of(desired, observed)
}

pub fn privacy_change(desired: &DomainConfig, observed: &DomainConfig) -> Change {
    Change::of(&desired.admin_privacy, &observed.admin_privacy)
        | Change::of(&desired.registrant_privacy, &observed.registrant_privacy)
        | Change::of(&desired.tech_privacy, &observed.tech_privacy)
}

/// Tag operations needed to turn `observed` into `desired`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagDiff {
    /// Keys to add or overwrite
    pub upsert: BTreeMap<String, String>,
    /// Keys to remove
    pub remove: Vec<String>,
}

impl TagDiff {
    pub fn between(observed: &BTreeMap<String, String>, desired: &BTreeMap<String, String>) -> Self {
        let upsert = desired
            .iter()
            .filter(|(k, v)| observed.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let remove = observed
            .keys()
            .filter(|k| !desired.contains_key(*k))
            .cloned()
            .collect();
        Self { upsert, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.upsert.is_empty() && self.remove.is_empty()
    }
}
