//! AWS resources for Stratus
//!
//! Two resource types, each a [`stratus_cloud::Resource`] implementation
//! driven by [`stratus_cloud::Reconciler`]:
//!
//! - [`MetricAlarmResource`]: CloudWatch metric alarms
//! - [`DomainResource`]: Route 53 registered domains
//!
//! Both talk to the control plane through a client trait
//! ([`CloudWatchApi`], [`DomainsApi`]). The [`memory`] module has
//! in-process implementations; the `sdk` feature adds ones built on the
//! AWS SDK.
//!
//! ```ignore
//! use std::sync::Arc;
//! use stratus_cloud::Reconciler;
//! use stratus_cloud_aws::{MetricAlarmResource, memory::InMemoryCloudWatch};
//!
//! let reconciler = Reconciler::new(MetricAlarmResource::new(Arc::new(InMemoryCloudWatch::default())));
//! let tracked = reconciler.create(&desired).await?;
//! ```

pub mod alarm;
pub mod domain;
pub mod error;
pub mod memory;

#[cfg(feature = "sdk")]
pub mod sdk;

pub use alarm::{CloudWatchApi, MetricAlarmConfig, MetricAlarmFields, MetricAlarmResource, MetricAlarmState};
pub use domain::{DomainConfig, DomainResource, DomainState, DomainsApi};
pub use error::{ApiError, ApiResult};
