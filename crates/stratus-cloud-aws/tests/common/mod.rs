use std::collections::BTreeMap;
use std::sync::Arc;
use stratus_cloud::{PollConfig, Reconciler};
use stratus_cloud_aws::memory::{InMemoryCloudWatch, InMemoryDomains};
use stratus_cloud_aws::{DomainResource, MetricAlarmFields, MetricAlarmResource};
use stratus_config::{StratusConfig, Timeouts};

#[allow(dead_code)]
pub const ALARM_TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:ops-alerts";

#[allow(dead_code)]
pub fn cpu_high() -> MetricAlarmFields {
    MetricAlarmFields {
        alarm_name: "cpu-high".to_string(),
        comparison_operator: "GreaterThanThreshold".to_string(),
        evaluation_periods: 2,
        threshold: 80.0,
        metric_name: Some("CPUUtilization".to_string()),
        namespace: Some("AWS/EC2".to_string()),
        period: Some(120),
        statistic: Some("Average".to_string()),
        dimensions: BTreeMap::from([("InstanceId".to_string(), "i-0abc123".to_string())]),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn alarm_reconciler() -> (Arc<InMemoryCloudWatch>, Reconciler<MetricAlarmResource>) {
    let api = Arc::new(InMemoryCloudWatch::default());
    let reconciler = Reconciler::new(MetricAlarmResource::new(api.clone()));
    (api, reconciler)
}

/// Short poll interval and one-minute timeouts
#[allow(dead_code)]
pub fn domain_reconciler() -> (Arc<InMemoryDomains>, Reconciler<DomainResource>) {
    let api = Arc::new(InMemoryDomains::new());
    let config = StratusConfig {
        poll: PollConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            multiplier: 2.0,
        },
        timeouts: Timeouts {
            create_secs: 60,
            update_secs: 60,
            delete_secs: 60,
        },
        ..Default::default()
    };
    let resource = DomainResource::from_config(api.clone(), &config);
    (api, Reconciler::new(resource))
}
