//! Route 53 registered domains

pub mod api;
pub mod model;
pub mod resource;

pub use api::{DomainDetail, DomainsApi, OperationDetail, OperationStatus};
pub use model::{ContactDetail, DomainConfig, DomainState, Nameserver, TagDiff};
pub use resource::{DomainRecord, DomainResource};
