//! Metric alarm records
//!
//! [`MetricAlarmFields`] is the flat, attribute-shaped record an engine
//! hands in and gets back. It can describe combinations the API rejects
//! (both `statistic` and `extended_statistic`, a single metric and a query
//! list at once). [`MetricAlarmConfig`] is the validated form: every
//! "exactly one of" group is a sum type there, so an invalid combination
//! cannot be built. Conversion between the two is where validation lives.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use stratus_cloud::{CloudError, Result};

pub const COMPARISON_OPERATORS: [&str; 7] = [
    "GreaterThanOrEqualToThreshold",
    "GreaterThanThreshold",
    "LessThanThreshold",
    "LessThanOrEqualToThreshold",
    "LessThanLowerOrGreaterThanUpperThreshold",
    "LessThanLowerThreshold",
    "GreaterThanUpperThreshold",
];

pub const TREAT_MISSING_DATA: [&str; 4] = ["breaching", "notBreaching", "ignore", "missing"];

pub const LOW_SAMPLE_COUNT_PERCENTILES: [&str; 2] = ["evaluate", "ignore"];

const DEFAULT_TREAT_MISSING_DATA: &str = "missing";

/// Flat metric alarm record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricAlarmFields {
    pub alarm_name: String,
    pub comparison_operator: String,
    pub evaluation_periods: u32,
    pub threshold: f64,

    // Single metric
    pub metric_name: Option<String>,
    pub namespace: Option<String>,
    pub period: Option<u32>,
    pub statistic: Option<String>,
    pub extended_statistic: Option<String>,
    pub dimensions: BTreeMap<String, String>,

    // Metric math
    pub metric_query: Vec<MetricQueryFields>,

    pub actions_enabled: bool,
    pub alarm_actions: BTreeSet<String>,
    pub ok_actions: BTreeSet<String>,
    pub insufficient_data_actions: BTreeSet<String>,
    pub alarm_description: Option<String>,
    pub datapoints_to_alarm: Option<u32>,
    pub unit: Option<String>,
    pub treat_missing_data: String,
    pub evaluate_low_sample_count_percentiles: Option<String>,
}

impl Default for MetricAlarmFields {
    fn default() -> Self {
        Self {
            alarm_name: String::new(),
            comparison_operator: String::new(),
            evaluation_periods: 0,
            threshold: 0.0,
            metric_name: None,
            namespace: None,
            period: None,
            statistic: None,
            extended_statistic: None,
            dimensions: BTreeMap::new(),
            metric_query: Vec::new(),
            actions_enabled: true,
            alarm_actions: BTreeSet::new(),
            ok_actions: BTreeSet::new(),
            insufficient_data_actions: BTreeSet::new(),
            alarm_description: None,
            datapoints_to_alarm: None,
            unit: None,
            treat_missing_data: DEFAULT_TREAT_MISSING_DATA.to_string(),
            evaluate_low_sample_count_percentiles: None,
        }
    }
}

/// One entry of a metric math query list, flat form
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricQueryFields {
    pub id: String,
    pub expression: Option<String>,
    pub label: Option<String>,
    pub return_data: bool,
    pub metric: Option<MetricStat>,
}

/// A metric plus the statistic to take over a period
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricStat {
    pub metric_name: String,
    pub namespace: Option<String>,
    pub period: u32,
    pub stat: String,
    pub unit: Option<String>,
    pub dimensions: BTreeMap<String, String>,
}

/// Observed metric alarm: the flat record plus computed attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAlarmState {
    #[serde(flatten)]
    pub fields: MetricAlarmFields,
    pub arn: Option<String>,
}

/// Validated metric alarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAlarmConfig {
    pub alarm_name: String,
    pub comparison_operator: String,
    pub evaluation_periods: u32,
    pub threshold: f64,
    pub metric: MetricSource,
    pub actions_enabled: bool,
    pub alarm_actions: BTreeSet<String>,
    pub ok_actions: BTreeSet<String>,
    pub insufficient_data_actions: BTreeSet<String>,
    pub alarm_description: Option<String>,
    pub datapoints_to_alarm: Option<u32>,
    pub unit: Option<String>,
    pub treat_missing_data: String,
    pub evaluate_low_sample_count_percentiles: Option<String>,
}

/// What the alarm watches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    /// One metric with a statistic
    Single(SingleMetric),
    /// A metric math query list
    Queries(Vec<MetricQuery>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleMetric {
    pub metric_name: String,
    pub namespace: Option<String>,
    pub period: Option<u32>,
    pub statistic: StatisticChoice,
    pub dimensions: BTreeMap<String, String>,
}

/// A plain statistic ("Average") or a percentile ("p99")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticChoice {
    Statistic(String),
    Extended(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub id: String,
    pub label: Option<String>,
    pub return_data: bool,
    pub body: QueryBody,
}

/// A query is either a math expression or a metric reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryBody {
    Expression(String),
    Metric(MetricStat),
}

/// `Some` only for a non-blank string
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

/// The listed spelling of a case-insensitively matched value
fn canonical(allowed: &[&'static str], value: &str) -> Option<&'static str> {
    allowed.iter().copied().find(|v| v.eq_ignore_ascii_case(value))
}

/// Largest count the API accepts (its integers are signed 32-bit)
const MAX_API_INT: u32 = i32::MAX as u32;

impl MetricStat {
    /// Blank optional strings dropped
    pub(crate) fn normalized(&self) -> Self {
        Self {
            namespace: blank_to_none(&self.namespace),
            unit: blank_to_none(&self.unit),
            ..self.clone()
        }
    }
}

impl MetricQueryFields {
    /// Blank optional strings dropped, as they are before being sent
    pub(crate) fn normalized(&self) -> Self {
        Self {
            id: self.id.clone(),
            expression: blank_to_none(&self.expression),
            label: blank_to_none(&self.label),
            return_data: self.return_data,
            metric: self.metric.as_ref().map(MetricStat::normalized),
        }
    }
}

/// Loose ARN shape check: `arn:partition:service:region:account:resource`
fn is_arn(value: &str) -> bool {
    value.starts_with("arn:") && value.splitn(6, ':').count() == 6
}

impl MetricAlarmConfig {
    /// Check the constraints the types leave open
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| -> Result<()> {
            Err(CloudError::validation(&self.alarm_name, message))
        };

        if self.alarm_name.is_empty() {
            return Err(CloudError::validation(
                "<unnamed>",
                "alarm_name must not be empty",
            ));
        }
        if !COMPARISON_OPERATORS.contains(&self.comparison_operator.as_str()) {
            return invalid(format!(
                "comparison_operator must be one of {} (got {:?})",
                COMPARISON_OPERATORS.join(", "),
                self.comparison_operator
            ));
        }
        if self.evaluation_periods < 1 {
            return invalid("evaluation_periods must be at least 1".to_string());
        }
        if self.datapoints_to_alarm == Some(0) {
            return invalid("datapoints_to_alarm must be at least 1".to_string());
        }
        let counts = [
            ("evaluation_periods", Some(self.evaluation_periods)),
            ("datapoints_to_alarm", self.datapoints_to_alarm),
            ("period", self.single_period()),
        ];
        for (name, value) in counts {
            if let Some(value) = value.filter(|v| *v > MAX_API_INT) {
                return invalid(format!("{} must be at most {} (got {})", name, MAX_API_INT, value));
            }
        }
        if canonical(&TREAT_MISSING_DATA, &self.treat_missing_data).is_none() {
            return invalid(format!(
                "treat_missing_data must be one of {} (got {:?})",
                TREAT_MISSING_DATA.join(", "),
                self.treat_missing_data
            ));
        }
        if let Some(value) = &self.evaluate_low_sample_count_percentiles {
            if canonical(&LOW_SAMPLE_COUNT_PERCENTILES, value).is_none() {
                return invalid(format!(
                    "evaluate_low_sample_count_percentiles must be one of {} (got {:?})",
                    LOW_SAMPLE_COUNT_PERCENTILES.join(", "),
                    value
                ));
            }
        }
        if let Some(arn) = self.alarm_actions.iter().find(|a| !is_arn(a)) {
            return invalid(format!("alarm_actions entry {:?} is not an ARN", arn));
        }

        match &self.metric {
            MetricSource::Single(single) => {
                if single.metric_name.is_empty() {
                    return invalid("metric_name must not be empty".to_string());
                }
                let statistic = match &single.statistic {
                    StatisticChoice::Statistic(s) | StatisticChoice::Extended(s) => s,
                };
                if statistic.is_empty() {
                    return invalid("statistic must not be empty".to_string());
                }
            }
            MetricSource::Queries(queries) => {
                if queries.is_empty() {
                    return invalid("metric_query must not be empty".to_string());
                }
                let mut seen = BTreeSet::new();
                for query in queries {
                    if query.id.is_empty() {
                        return invalid("metric_query id must not be empty".to_string());
                    }
                    if let QueryBody::Metric(stat) = &query.body {
                        if stat.period > MAX_API_INT {
                            return invalid(format!(
                                "metric_query {:?}: period must be at most {} (got {})",
                                query.id, MAX_API_INT, stat.period
                            ));
                        }
                    }
                    if !seen.insert(query.id.as_str()) {
                        return invalid(format!("duplicate metric_query id {:?}", query.id));
                    }
                }
            }
        }
        Ok(())
    }

    fn single_period(&self) -> Option<u32> {
        match &self.metric {
            MetricSource::Single(single) => single.period,
            MetricSource::Queries(_) => None,
        }
    }
}

impl TryFrom<&MetricAlarmFields> for MetricAlarmConfig {
    type Error = CloudError;

    fn try_from(fields: &MetricAlarmFields) -> Result<Self> {
        let invalid = |message: &str| CloudError::validation(&fields.alarm_name, message);

        let metric = match (present(&fields.metric_name), fields.metric_query.is_empty()) {
            (Some(_), false) => {
                return Err(invalid("metric_name conflicts with metric_query"));
            }
            (None, true) => {
                return Err(invalid("one of `metric_name` or `metric_query` must be set"));
            }
            (Some(metric_name), true) => {
                let statistic = match (
                    present(&fields.statistic),
                    present(&fields.extended_statistic),
                ) {
                    (Some(s), None) => StatisticChoice::Statistic(s.to_string()),
                    (None, Some(s)) => StatisticChoice::Extended(s.to_string()),
                    _ => {
                        return Err(invalid(
                            "One of `statistic` or `extended_statistic` must be set for a cloudwatch metric alarm",
                        ));
                    }
                };
                MetricSource::Single(SingleMetric {
                    metric_name: metric_name.to_string(),
                    namespace: blank_to_none(&fields.namespace),
                    period: fields.period,
                    statistic,
                    dimensions: fields.dimensions.clone(),
                })
            }
            (None, false) => {
                let conflicting = [
                    ("namespace", present(&fields.namespace).is_some()),
                    ("period", fields.period.is_some()),
                    ("statistic", present(&fields.statistic).is_some()),
                    (
                        "extended_statistic",
                        present(&fields.extended_statistic).is_some(),
                    ),
                    ("dimensions", !fields.dimensions.is_empty()),
                ];
                if let Some((name, _)) = conflicting.iter().find(|(_, set)| *set) {
                    return Err(invalid(&format!("{} conflicts with metric_query", name)));
                }
                let queries = fields
                    .metric_query
                    .iter()
                    .map(|q| MetricQuery::try_from_fields(q, &fields.alarm_name))
                    .collect::<Result<Vec<_>>>()?;
                MetricSource::Queries(queries)
            }
        };

        let config = Self {
            alarm_name: fields.alarm_name.clone(),
            comparison_operator: fields.comparison_operator.clone(),
            evaluation_periods: fields.evaluation_periods,
            threshold: fields.threshold,
            metric,
            actions_enabled: fields.actions_enabled,
            alarm_actions: fields.alarm_actions.clone(),
            ok_actions: fields.ok_actions.clone(),
            insufficient_data_actions: fields.insufficient_data_actions.clone(),
            alarm_description: blank_to_none(&fields.alarm_description),
            datapoints_to_alarm: fields.datapoints_to_alarm,
            unit: blank_to_none(&fields.unit),
            treat_missing_data: canonical(&TREAT_MISSING_DATA, &fields.treat_missing_data)
                .map(str::to_string)
                .unwrap_or_else(|| fields.treat_missing_data.clone()),
            evaluate_low_sample_count_percentiles: present(
                &fields.evaluate_low_sample_count_percentiles,
            )
            .map(|v| {
                canonical(&LOW_SAMPLE_COUNT_PERCENTILES, v)
                    .unwrap_or(v)
                    .to_string()
            }),
        };
        config.validate()?;
        Ok(config)
    }
}

impl MetricQuery {
    fn try_from_fields(fields: &MetricQueryFields, alarm_name: &str) -> Result<Self> {
        let body = match (present(&fields.expression), &fields.metric) {
            (Some(expression), None) => QueryBody::Expression(expression.to_string()),
            (None, Some(metric)) => QueryBody::Metric(metric.normalized()),
            _ => {
                return Err(CloudError::validation(
                    alarm_name,
                    format!(
                        "metric_query {:?}: exactly one of `expression` or `metric` must be set",
                        fields.id
                    ),
                ));
            }
        };
        Ok(Self {
            id: fields.id.clone(),
            label: blank_to_none(&fields.label),
            return_data: fields.return_data,
            body,
        })
    }
}

impl From<&MetricAlarmConfig> for MetricAlarmFields {
    fn from(config: &MetricAlarmConfig) -> Self {
        let mut fields = MetricAlarmFields {
            alarm_name: config.alarm_name.clone(),
            comparison_operator: config.comparison_operator.clone(),
            evaluation_periods: config.evaluation_periods,
            threshold: config.threshold,
            actions_enabled: config.actions_enabled,
            alarm_actions: config.alarm_actions.clone(),
            ok_actions: config.ok_actions.clone(),
            insufficient_data_actions: config.insufficient_data_actions.clone(),
            alarm_description: config.alarm_description.clone(),
            datapoints_to_alarm: config.datapoints_to_alarm,
            unit: config.unit.clone(),
            treat_missing_data: config.treat_missing_data.clone(),
            evaluate_low_sample_count_percentiles: config
                .evaluate_low_sample_count_percentiles
                .clone(),
            ..Default::default()
        };

        match &config.metric {
            MetricSource::Single(single) => {
                fields.metric_name = Some(single.metric_name.clone());
                fields.namespace = single.namespace.clone();
                fields.period = single.period;
                fields.dimensions = single.dimensions.clone();
                match &single.statistic {
                    StatisticChoice::Statistic(s) => fields.statistic = Some(s.clone()),
                    StatisticChoice::Extended(s) => fields.extended_statistic = Some(s.clone()),
                }
            }
            MetricSource::Queries(queries) => {
                fields.metric_query = queries
                    .iter()
                    .map(|q| {
                        let (expression, metric) = match &q.body {
                            QueryBody::Expression(e) => (Some(e.clone()), None),
                            QueryBody::Metric(m) => (None, Some(m.clone())),
                        };
                        MetricQueryFields {
                            id: q.id.clone(),
                            expression,
                            label: q.label.clone(),
                            return_data: q.return_data,
                            metric,
                        }
                    })
                    .collect();
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_high() -> MetricAlarmFields {
        MetricAlarmFields {
            alarm_name: "cpu-high".to_string(),
            comparison_operator: "GreaterThanThreshold".to_string(),
            evaluation_periods: 2,
            threshold: 80.0,
            metric_name: Some("CPUUtilization".to_string()),
            namespace: Some("AWS/EC2".to_string()),
            period: Some(120),
            statistic: Some("Average".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_metric_converts() {
        let config = MetricAlarmConfig::try_from(&cpu_high()).unwrap();
        match &config.metric {
            MetricSource::Single(single) => {
                assert_eq!(single.metric_name, "CPUUtilization");
                assert_eq!(
                    single.statistic,
                    StatisticChoice::Statistic("Average".to_string())
                );
            }
            other => panic!("Expected single metric, got {:?}", other),
        }
        assert!(config.actions_enabled);
        assert_eq!(config.treat_missing_data, "missing");
    }

    #[test]
    fn test_both_statistics_rejected() {
        let mut fields = cpu_high();
        fields.extended_statistic = Some("p99".to_string());

        let err = MetricAlarmConfig::try_from(&fields).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("`statistic` or `extended_statistic`"));
    }

    #[test]
    fn test_neither_statistic_rejected() {
        let mut fields = cpu_high();
        fields.statistic = None;
        assert!(MetricAlarmConfig::try_from(&fields).unwrap_err().is_validation());
    }

    #[test]
    fn test_blank_statistic_counts_as_unset() {
        let mut fields = cpu_high();
        fields.extended_statistic = Some(String::new());
        assert!(MetricAlarmConfig::try_from(&fields).is_ok());
    }

    #[test]
    fn test_metric_name_conflicts_with_queries() {
        let mut fields = cpu_high();
        fields.metric_query.push(MetricQueryFields {
            id: "e1".to_string(),
            expression: Some("m1 * 2".to_string()),
            ..Default::default()
        });
        let err = MetricAlarmConfig::try_from(&fields).unwrap_err();
        assert!(err.to_string().contains("conflicts with metric_query"));
    }

    #[test]
    fn test_query_needs_exactly_one_body() {
        let fields = MetricAlarmFields {
            alarm_name: "error-rate".to_string(),
            comparison_operator: "GreaterThanThreshold".to_string(),
            evaluation_periods: 1,
            metric_query: vec![MetricQueryFields {
                id: "e1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = MetricAlarmConfig::try_from(&fields).unwrap_err();
        assert!(err.to_string().contains("`expression` or `metric`"));
    }

    #[test]
    fn test_queries_reject_single_metric_settings() {
        let fields = MetricAlarmFields {
            alarm_name: "error-rate".to_string(),
            comparison_operator: "GreaterThanThreshold".to_string(),
            evaluation_periods: 1,
            period: Some(60),
            metric_query: vec![MetricQueryFields {
                id: "e1".to_string(),
                expression: Some("m1 / m2".to_string()),
                return_data: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = MetricAlarmConfig::try_from(&fields).unwrap_err();
        assert!(err.to_string().contains("period conflicts"));
    }

    #[test]
    fn test_validate_rules() {
        let mut fields = cpu_high();
        fields.evaluation_periods = 0;
        assert!(MetricAlarmConfig::try_from(&fields).is_err());

        let mut fields = cpu_high();
        fields.comparison_operator = "Bigger".to_string();
        assert!(MetricAlarmConfig::try_from(&fields).is_err());

        let mut fields = cpu_high();
        fields.treat_missing_data = "sometimes".to_string();
        assert!(MetricAlarmConfig::try_from(&fields).is_err());

        let mut fields = cpu_high();
        fields.alarm_actions.insert("not-an-arn".to_string());
        assert!(MetricAlarmConfig::try_from(&fields).is_err());

        let mut fields = cpu_high();
        fields
            .alarm_actions
            .insert("arn:aws:sns:us-east-1:123456789012:ops".to_string());
        assert!(MetricAlarmConfig::try_from(&fields).is_ok());
    }

    #[test]
    fn test_counts_beyond_api_range_rejected() {
        let too_big = i32::MAX as u32 + 1;

        let mut fields = cpu_high();
        fields.evaluation_periods = too_big;
        let err = MetricAlarmConfig::try_from(&fields).unwrap_err();
        assert!(err.to_string().contains("evaluation_periods must be at most"));

        let mut fields = cpu_high();
        fields.period = Some(too_big);
        assert!(MetricAlarmConfig::try_from(&fields).unwrap_err().is_validation());

        let mut fields = cpu_high();
        fields.datapoints_to_alarm = Some(too_big);
        assert!(MetricAlarmConfig::try_from(&fields).unwrap_err().is_validation());

        let mut fields = cpu_high();
        fields.evaluation_periods = i32::MAX as u32;
        assert!(MetricAlarmConfig::try_from(&fields).is_ok());
    }

    #[test]
    fn test_enumerated_values_take_listed_spelling() {
        let mut fields = cpu_high();
        fields.treat_missing_data = "NOTBREACHING".to_string();
        fields.evaluate_low_sample_count_percentiles = Some("Ignore".to_string());

        let config = MetricAlarmConfig::try_from(&fields).unwrap();
        assert_eq!(config.treat_missing_data, "notBreaching");
        assert_eq!(
            config.evaluate_low_sample_count_percentiles.as_deref(),
            Some("ignore")
        );
    }

    #[test]
    fn test_blank_query_strings_are_dropped() {
        let fields = MetricAlarmFields {
            alarm_name: "request-count".to_string(),
            comparison_operator: "GreaterThanThreshold".to_string(),
            evaluation_periods: 1,
            metric_query: vec![MetricQueryFields {
                id: "m1".to_string(),
                expression: Some(String::new()),
                label: Some(String::new()),
                return_data: true,
                metric: Some(MetricStat {
                    metric_name: "RequestCount".to_string(),
                    namespace: Some(String::new()),
                    period: 60,
                    stat: "Sum".to_string(),
                    unit: Some(String::new()),
                    ..Default::default()
                }),
            }],
            ..Default::default()
        };

        let config = MetricAlarmConfig::try_from(&fields).unwrap();
        match &config.metric {
            MetricSource::Queries(queries) => {
                assert_eq!(queries[0].label, None);
                match &queries[0].body {
                    QueryBody::Metric(stat) => {
                        assert_eq!(stat.namespace, None);
                        assert_eq!(stat.unit, None);
                    }
                    other => panic!("Expected metric body, got {:?}", other),
                }
            }
            other => panic!("Expected queries, got {:?}", other),
        }
    }

    #[test]
    fn test_config_to_fields_roundtrip() {
        let fields = cpu_high();
        let config = MetricAlarmConfig::try_from(&fields).unwrap();
        assert_eq!(MetricAlarmFields::from(&config), fields);
    }

    #[test]
    fn test_fields_deserialize_with_defaults() {
        let fields: MetricAlarmFields = serde_json::from_value(serde_json::json!({
            "alarm_name": "cpu-high",
            "comparison_operator": "GreaterThanThreshold",
            "evaluation_periods": 2,
            "threshold": 80.0,
        }))
        .unwrap();
        assert!(fields.actions_enabled);
        assert_eq!(fields.treat_missing_data, "missing");
        assert!(fields.metric_query.is_empty());
    }
}
