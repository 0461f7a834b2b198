//! CloudWatch metric alarms

pub mod api;
pub mod model;
pub mod resource;

pub use api::{
    CloudWatchApi, Dimension, Metric, MetricAlarm, MetricDataQuery, MetricStatRecord,
    PutMetricAlarmInput,
};
pub use model::{
    MetricAlarmConfig, MetricAlarmFields, MetricAlarmState, MetricQuery, MetricQueryFields,
    MetricSource, MetricStat, QueryBody, SingleMetric, StatisticChoice,
};
pub use resource::{MetricAlarmResource, put_input};
