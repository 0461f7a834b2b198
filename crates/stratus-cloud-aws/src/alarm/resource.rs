//! CloudWatch metric alarm resource
//!
//! PutMetricAlarm is a full replace, so update sends the whole desired
//! alarm in one call. It is skipped when nothing declared has changed.

use super::api::{
    CloudWatchApi, Dimension, Metric, MetricAlarm, MetricDataQuery, MetricStatRecord,
    PutMetricAlarmInput,
};
use super::model::{
    MetricAlarmConfig, MetricAlarmFields, MetricAlarmState, MetricQueryFields, MetricSource,
    MetricStat, QueryBody, StatisticChoice, present,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use stratus_cloud::{ChangeSet, Identity, Resource, Result, UpdateReport};

pub const RESOURCE_TYPE: &str = "metric-alarm";

/// The whole alarm is one aspect; it is always written in a single call
const ALARM_ASPECT: &str = "alarm";

/// CloudWatch metric alarm
pub struct MetricAlarmResource {
    api: Arc<dyn CloudWatchApi>,
}

impl MetricAlarmResource {
    pub fn new(api: Arc<dyn CloudWatchApi>) -> Self {
        Self { api }
    }

    async fn put(&self, config: &MetricAlarmConfig) -> Result<()> {
        tracing::debug!("PutMetricAlarm: {}", config.alarm_name);
        self.api
            .put_metric_alarm(put_input(config))
            .await
            .map_err(|e| e.into_remote("PutMetricAlarm", &config.alarm_name))
    }
}

#[async_trait]
impl Resource for MetricAlarmResource {
    type Desired = MetricAlarmFields;
    type Remote = MetricAlarm;
    type State = MetricAlarmState;

    fn resource_type(&self) -> &str {
        RESOURCE_TYPE
    }

    fn identity_of(&self, desired: &MetricAlarmFields) -> Identity {
        Identity::new(desired.alarm_name.clone())
    }

    fn validate(&self, desired: &MetricAlarmFields) -> Result<()> {
        MetricAlarmConfig::try_from(desired).map(|_| ())
    }

    async fn create(&self, desired: &MetricAlarmFields) -> Result<Identity> {
        let config = MetricAlarmConfig::try_from(desired)?;
        self.put(&config).await?;
        Ok(Identity::new(config.alarm_name))
    }

    async fn read(&self, identity: &Identity) -> Result<Option<MetricAlarm>> {
        let alarms = self
            .api
            .describe_alarms(&[identity.to_string()])
            .await
            .map_err(|e| e.into_remote("DescribeAlarms", identity.as_str()))?;

        // The listing may include near-matches; only the exact name counts
        Ok(alarms
            .into_iter()
            .find(|alarm| alarm.alarm_name == identity.as_str()))
    }

    fn flatten(&self, remote: &MetricAlarm) -> MetricAlarmState {
        MetricAlarmState {
            fields: MetricAlarmFields {
                alarm_name: remote.alarm_name.clone(),
                comparison_operator: remote.comparison_operator.clone().unwrap_or_default(),
                evaluation_periods: to_u32(remote.evaluation_periods),
                threshold: remote.threshold.unwrap_or_default(),
                metric_name: remote.metric_name.clone(),
                namespace: remote.namespace.clone(),
                period: remote.period.map(|p| to_u32(Some(p))),
                statistic: remote.statistic.clone(),
                extended_statistic: remote.extended_statistic.clone(),
                dimensions: flatten_dimensions(&remote.dimensions),
                metric_query: remote.metrics.iter().map(flatten_query).collect(),
                actions_enabled: remote.actions_enabled.unwrap_or(true),
                alarm_actions: remote.alarm_actions.iter().cloned().collect(),
                ok_actions: remote.ok_actions.iter().cloned().collect(),
                insufficient_data_actions: remote
                    .insufficient_data_actions
                    .iter()
                    .cloned()
                    .collect(),
                alarm_description: remote.alarm_description.clone(),
                datapoints_to_alarm: remote.datapoints_to_alarm.map(|d| to_u32(Some(d))),
                unit: remote.unit.clone(),
                treat_missing_data: remote
                    .treat_missing_data
                    .clone()
                    .unwrap_or_else(|| "missing".to_string()),
                evaluate_low_sample_count_percentiles: remote
                    .evaluate_low_sample_count_percentile
                    .clone(),
            },
            arn: remote.alarm_arn.clone(),
        }
    }

    fn diff(&self, prior: &MetricAlarmState, desired: &MetricAlarmFields) -> ChangeSet {
        let observed = &prior.fields;
        let mut changes = ChangeSet::new();
        changes
            .field(
                "comparison_operator",
                &observed.comparison_operator,
                &desired.comparison_operator,
            )
            .field(
                "evaluation_periods",
                &observed.evaluation_periods,
                &desired.evaluation_periods,
            )
            .field("threshold", &observed.threshold, &desired.threshold)
            .field(
                "metric_name",
                &present(&observed.metric_name),
                &present(&desired.metric_name),
            )
            .field(
                "namespace",
                &present(&observed.namespace),
                &present(&desired.namespace),
            )
            .field("period", &observed.period, &desired.period)
            .field(
                "statistic",
                &present(&observed.statistic),
                &present(&desired.statistic),
            )
            .field(
                "extended_statistic",
                &present(&observed.extended_statistic),
                &present(&desired.extended_statistic),
            )
            .field("dimensions", &observed.dimensions, &desired.dimensions)
            .field(
                "metric_query",
                &queries_by_id(&observed.metric_query),
                &queries_by_id(&desired.metric_query),
            )
            .field(
                "actions_enabled",
                &observed.actions_enabled,
                &desired.actions_enabled,
            )
            .field("alarm_actions", &observed.alarm_actions, &desired.alarm_actions)
            .field("ok_actions", &observed.ok_actions, &desired.ok_actions)
            .field(
                "insufficient_data_actions",
                &observed.insufficient_data_actions,
                &desired.insufficient_data_actions,
            )
            .field(
                "alarm_description",
                &present(&observed.alarm_description),
                &present(&desired.alarm_description),
            )
            .field(
                "datapoints_to_alarm",
                &observed.datapoints_to_alarm,
                &desired.datapoints_to_alarm,
            )
            .field("unit", &present(&observed.unit), &present(&desired.unit))
            .field(
                "treat_missing_data",
                &observed.treat_missing_data.to_ascii_lowercase(),
                &desired.treat_missing_data.to_ascii_lowercase(),
            );

        // Left to the API when not declared
        if let Some(desired_value) = present(&desired.evaluate_low_sample_count_percentiles) {
            changes.field(
                "evaluate_low_sample_count_percentiles",
                &present(&observed.evaluate_low_sample_count_percentiles)
                    .map(str::to_ascii_lowercase),
                &Some(desired_value.to_ascii_lowercase()),
            );
        }
        changes
    }

    async fn update(
        &self,
        identity: &Identity,
        prior: &MetricAlarmState,
        desired: &MetricAlarmFields,
    ) -> Result<UpdateReport> {
        let mut report = UpdateReport::new();
        let changes = self.diff(prior, desired);
        if changes.is_empty() {
            tracing::debug!("Metric alarm {} matches desired state", identity);
            report.add_unchanged(ALARM_ASPECT);
            return Ok(report);
        }

        tracing::debug!(
            "Metric alarm {} changed: {}",
            identity,
            changes.fields().join(", ")
        );
        let config = MetricAlarmConfig::try_from(desired)?;
        self.put(&config).await?;
        report.add_success(ALARM_ASPECT);
        Ok(report)
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        self.api
            .delete_alarms(&[identity.to_string()])
            .await
            .map_err(|e| e.into_remote("DeleteAlarms", identity.as_str()))
    }
}

/// Build the PutMetricAlarm request, leaving out everything not set
pub fn put_input(config: &MetricAlarmConfig) -> PutMetricAlarmInput {
    let mut input = PutMetricAlarmInput {
        alarm_name: config.alarm_name.clone(),
        comparison_operator: config.comparison_operator.clone(),
        evaluation_periods: to_i32(config.evaluation_periods),
        threshold: config.threshold,
        actions_enabled: Some(config.actions_enabled),
        alarm_actions: config.alarm_actions.iter().cloned().collect(),
        ok_actions: config.ok_actions.iter().cloned().collect(),
        insufficient_data_actions: config.insufficient_data_actions.iter().cloned().collect(),
        alarm_description: config.alarm_description.clone(),
        datapoints_to_alarm: config.datapoints_to_alarm.map(to_i32),
        unit: config.unit.clone(),
        treat_missing_data: Some(config.treat_missing_data.clone()),
        evaluate_low_sample_count_percentile: config
            .evaluate_low_sample_count_percentiles
            .clone(),
        ..Default::default()
    };

    match &config.metric {
        MetricSource::Single(single) => {
            input.metric_name = Some(single.metric_name.clone());
            input.namespace = single.namespace.clone();
            input.period = single.period.map(to_i32);
            input.dimensions = expand_dimensions(&single.dimensions);
            match &single.statistic {
                StatisticChoice::Statistic(s) => input.statistic = Some(s.clone()),
                StatisticChoice::Extended(s) => input.extended_statistic = Some(s.clone()),
            }
        }
        MetricSource::Queries(queries) => {
            input.metrics = queries
                .iter()
                .map(|query| {
                    let mut record = MetricDataQuery {
                        id: query.id.clone(),
                        label: query.label.clone(),
                        return_data: Some(query.return_data),
                        ..Default::default()
                    };
                    match &query.body {
                        QueryBody::Expression(expression) => {
                            record.expression = Some(expression.clone())
                        }
                        QueryBody::Metric(stat) => {
                            record.metric_stat = Some(MetricStatRecord {
                                metric: Metric {
                                    metric_name: Some(stat.metric_name.clone()),
                                    namespace: stat.namespace.clone(),
                                    dimensions: expand_dimensions(&stat.dimensions),
                                },
                                period: Some(to_i32(stat.period)),
                                stat: Some(stat.stat.clone()),
                                unit: stat.unit.clone(),
                            })
                        }
                    }
                    record
                })
                .collect();
        }
    }
    input
}

fn expand_dimensions(dimensions: &BTreeMap<String, String>) -> Vec<Dimension> {
    dimensions
        .iter()
        .map(|(name, value)| Dimension {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

fn flatten_dimensions(dimensions: &[Dimension]) -> BTreeMap<String, String> {
    dimensions
        .iter()
        .map(|d| (d.name.clone(), d.value.clone()))
        .collect()
}

fn flatten_query(query: &MetricDataQuery) -> MetricQueryFields {
    MetricQueryFields {
        id: query.id.clone(),
        expression: query.expression.clone(),
        label: query.label.clone(),
        return_data: query.return_data.unwrap_or(false),
        metric: query.metric_stat.as_ref().map(|stat| MetricStat {
            metric_name: stat.metric.metric_name.clone().unwrap_or_default(),
            namespace: stat.metric.namespace.clone(),
            period: to_u32(stat.period),
            stat: stat.stat.clone().unwrap_or_default(),
            unit: stat.unit.clone(),
            dimensions: flatten_dimensions(&stat.metric.dimensions),
        }),
    }
}

/// Query lists are compared as sets keyed by id, blank strings as unset
fn queries_by_id(queries: &[MetricQueryFields]) -> BTreeMap<&str, MetricQueryFields> {
    queries.iter().map(|q| (q.id.as_str(), q.normalized())).collect()
}

/// Counts are range-checked during validation
fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: Option<i32>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}
