//! CloudWatch metric alarm API surface

use crate::error::ApiResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Name/value pair identifying a metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: Option<String>,
    pub namespace: Option<String>,
    pub dimensions: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricStatRecord {
    pub metric: Metric,
    pub period: Option<i32>,
    pub stat: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricDataQuery {
    pub id: String,
    pub expression: Option<String>,
    pub label: Option<String>,
    pub return_data: Option<bool>,
    pub metric_stat: Option<MetricStatRecord>,
}

/// PutMetricAlarm request; `None` / empty means "not sent"
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PutMetricAlarmInput {
    pub alarm_name: String,
    pub comparison_operator: String,
    pub evaluation_periods: i32,
    pub threshold: f64,
    pub actions_enabled: Option<bool>,
    pub alarm_actions: Vec<String>,
    pub ok_actions: Vec<String>,
    pub insufficient_data_actions: Vec<String>,
    pub alarm_description: Option<String>,
    pub datapoints_to_alarm: Option<i32>,
    pub metric_name: Option<String>,
    pub namespace: Option<String>,
    pub period: Option<i32>,
    pub statistic: Option<String>,
    pub extended_statistic: Option<String>,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<MetricDataQuery>,
    pub unit: Option<String>,
    pub treat_missing_data: Option<String>,
    pub evaluate_low_sample_count_percentile: Option<String>,
}

/// An alarm as DescribeAlarms reports it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricAlarm {
    pub alarm_name: String,
    pub alarm_arn: Option<String>,
    pub comparison_operator: Option<String>,
    pub evaluation_periods: Option<i32>,
    pub threshold: Option<f64>,
    pub actions_enabled: Option<bool>,
    pub alarm_actions: Vec<String>,
    pub ok_actions: Vec<String>,
    pub insufficient_data_actions: Vec<String>,
    pub alarm_description: Option<String>,
    pub datapoints_to_alarm: Option<i32>,
    pub metric_name: Option<String>,
    pub namespace: Option<String>,
    pub period: Option<i32>,
    pub statistic: Option<String>,
    pub extended_statistic: Option<String>,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<MetricDataQuery>,
    pub unit: Option<String>,
    pub treat_missing_data: Option<String>,
    pub evaluate_low_sample_count_percentile: Option<String>,
    pub state_value: Option<String>,
}

/// CloudWatch operations the metric alarm resource needs
#[async_trait]
pub trait CloudWatchApi: Send + Sync {
    /// Create or fully replace an alarm
    async fn put_metric_alarm(&self, input: PutMetricAlarmInput) -> ApiResult<()>;

    /// List alarms matching the given names
    ///
    /// Callers must not assume the result only contains exact matches.
    async fn describe_alarms(&self, alarm_names: &[String]) -> ApiResult<Vec<MetricAlarm>>;

    async fn delete_alarms(&self, alarm_names: &[String]) -> ApiResult<()>;
}
