mod common;

use common::{ALARM_TOPIC, alarm_reconciler, cpu_high};
use stratus_cloud::{ActionType, CloudError, Identity, Outcome, Reconciler, Resource, Tracked};
use stratus_cloud_aws::alarm::{MetricAlarm, MetricQueryFields, MetricStat};
use stratus_cloud_aws::{ApiError, MetricAlarmFields, MetricAlarmResource, MetricAlarmState};

#[tokio::test]
async fn test_create_single_metric_alarm() {
    let (api, reconciler) = alarm_reconciler();

    let tracked = reconciler.create(&cpu_high()).await.unwrap();

    assert_eq!(tracked.identity, Identity::new("cpu-high"));
    assert_eq!(tracked.state.fields.statistic.as_deref(), Some("Average"));
    assert_eq!(tracked.state.fields.extended_statistic, None);
    assert_eq!(
        tracked.state.arn.as_deref(),
        Some("arn:aws:cloudwatch:us-east-1:123456789012:alarm:cpu-high")
    );
    assert_eq!(api.calls(), vec!["PutMetricAlarm", "DescribeAlarms"]);

    // 送信されたのは設定済みのフィールドだけ
    let stored = api.alarm("cpu-high").unwrap();
    assert_eq!(stored.alarm_description, None);
    assert_eq!(stored.datapoints_to_alarm, None);
    assert!(stored.metrics.is_empty());
}

#[tokio::test]
async fn test_create_then_read_matches_desired() {
    let (_api, reconciler) = alarm_reconciler();
    let mut desired = cpu_high();
    desired.alarm_description = Some("CPU above 80% for 4 minutes".to_string());
    desired.datapoints_to_alarm = Some(2);
    desired.alarm_actions.insert(ALARM_TOPIC.to_string());
    desired.ok_actions.insert(ALARM_TOPIC.to_string());
    desired.treat_missing_data = "breaching".to_string();

    let tracked = reconciler.create(&desired).await.unwrap();

    assert_eq!(tracked.state.fields, desired);
    assert!(has_no_diff(&reconciler, &tracked, &desired));
}

#[tokio::test]
async fn test_both_statistics_fail_before_any_call() {
    let (api, reconciler) = alarm_reconciler();
    let mut desired = cpu_high();
    desired.extended_statistic = Some("p99".to_string());

    let err = reconciler.create(&desired).await.unwrap_err();

    assert!(matches!(err, CloudError::Validation { .. }));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_unchanged_update_issues_no_mutation() {
    let (api, reconciler) = alarm_reconciler();
    let tracked = reconciler.create(&cpu_high()).await.unwrap();
    api.clear_calls();

    let (fresh, report) = reconciler.update(&tracked, &cpu_high()).await.unwrap();

    assert!(!report.has_mutations());
    assert_eq!(api.mutation_count(), 0);
    assert_eq!(fresh.state, tracked.state);
}

#[tokio::test]
async fn test_update_puts_full_alarm() {
    let (api, reconciler) = alarm_reconciler();
    let tracked = reconciler.create(&cpu_high()).await.unwrap();
    api.clear_calls();

    let mut desired = cpu_high();
    desired.threshold = 90.0;
    let (fresh, report) = reconciler.update(&tracked, &desired).await.unwrap();

    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(api.calls(), vec!["PutMetricAlarm", "DescribeAlarms"]);
    assert_eq!(fresh.state.fields.threshold, 90.0);
    // 変更していないフィールドも保持される
    assert_eq!(fresh.state.fields.statistic.as_deref(), Some("Average"));
}

#[tokio::test]
async fn test_read_filters_to_exact_name() {
    let (api, reconciler) = alarm_reconciler();
    api.insert(MetricAlarm {
        alarm_name: "cpu-high-2".to_string(),
        ..Default::default()
    });

    assert!(reconciler.read(&Identity::new("cpu-high")).await.unwrap().is_none());

    reconciler.create(&cpu_high()).await.unwrap();
    let found = reconciler.read(&Identity::new("cpu-high")).await.unwrap().unwrap();
    assert_eq!(found.state.fields.alarm_name, "cpu-high");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (api, reconciler) = alarm_reconciler();
    let tracked = reconciler.create(&cpu_high()).await.unwrap();

    reconciler.delete(&tracked.identity).await.unwrap();
    assert!(reconciler.read(&tracked.identity).await.unwrap().is_none());
    assert!(reconciler.refresh(&tracked).await.unwrap().is_absent());

    api.clear_calls();
    reconciler.delete(&tracked.identity).await.unwrap();
    assert_eq!(api.calls(), vec!["DescribeAlarms"]);
}

#[tokio::test]
async fn test_reconcile_recreates_alarm_deleted_out_of_band() {
    let (api, reconciler) = alarm_reconciler();
    let tracked = reconciler.create(&cpu_high()).await.unwrap();
    api.remove("cpu-high");

    let outcome = reconciler
        .reconcile(Some(tracked), Some(&cpu_high()))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Present(_)));
    assert!(api.alarm("cpu-high").is_some());
}

#[tokio::test]
async fn test_rename_is_planned_as_replacement() {
    let (api, reconciler) = alarm_reconciler();
    let tracked = reconciler.create(&cpu_high()).await.unwrap();

    let mut renamed = cpu_high();
    renamed.alarm_name = "cpu-critical".to_string();
    assert_eq!(
        reconciler.plan(Some(&tracked), Some(&renamed)).action_type,
        ActionType::Replace
    );

    let outcome = reconciler
        .reconcile(Some(tracked), Some(&renamed))
        .await
        .unwrap();

    assert_eq!(
        outcome.tracked().unwrap().identity,
        Identity::new("cpu-critical")
    );
    assert!(api.alarm("cpu-high").is_none());
    assert!(api.alarm("cpu-critical").is_some());
}

#[tokio::test]
async fn test_remote_failure_names_operation() {
    let (api, reconciler) = alarm_reconciler();
    api.fail_next(
        "PutMetricAlarm",
        ApiError::rejected("LimitExceeded", "too many alarms"),
    );

    match reconciler.create(&cpu_high()).await {
        Err(CloudError::Remote {
            operation,
            identity,
            message,
        }) => {
            assert_eq!(operation, "PutMetricAlarm");
            assert_eq!(identity, "cpu-high");
            assert!(message.contains("LimitExceeded"));
        }
        other => panic!("Expected Remote error, got {:?}", other),
    }
    assert!(api.alarm("cpu-high").is_none());
}

#[tokio::test]
async fn test_import_existing_alarm() {
    let (_api, reconciler) = alarm_reconciler();
    reconciler.create(&cpu_high()).await.unwrap();

    let imported = reconciler.import(&Identity::new("cpu-high")).await.unwrap();
    assert_eq!(imported.state.fields, cpu_high());

    let err = reconciler
        .import(&Identity::new("does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Remote { .. }));
}

#[tokio::test]
async fn test_metric_math_alarm_roundtrip() {
    let (api, reconciler) = alarm_reconciler();
    let desired = MetricAlarmFields {
        alarm_name: "error-rate".to_string(),
        comparison_operator: "GreaterThanOrEqualToThreshold".to_string(),
        evaluation_periods: 3,
        threshold: 5.0,
        metric_query: vec![
            MetricQueryFields {
                id: "e1".to_string(),
                expression: Some("m2 / m1 * 100".to_string()),
                label: Some("Error Rate".to_string()),
                return_data: true,
                metric: None,
            },
            MetricQueryFields {
                id: "m1".to_string(),
                metric: Some(MetricStat {
                    metric_name: "RequestCount".to_string(),
                    namespace: Some("AWS/ApplicationELB".to_string()),
                    period: 120,
                    stat: "Sum".to_string(),
                    unit: Some("Count".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            MetricQueryFields {
                id: "m2".to_string(),
                metric: Some(MetricStat {
                    metric_name: "HTTPCode_ELB_5XX_Count".to_string(),
                    namespace: Some("AWS/ApplicationELB".to_string()),
                    period: 120,
                    stat: "Sum".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let tracked = reconciler.create(&desired).await.unwrap();
    assert_eq!(tracked.state.fields, desired);

    let stored = api.alarm("error-rate").unwrap();
    assert_eq!(stored.metric_name, None);
    assert_eq!(stored.metrics.len(), 3);

    // クエリの順序は差分に影響しない
    let mut reordered = desired.clone();
    reordered.metric_query.reverse();
    assert!(has_no_diff(&reconciler, &tracked, &reordered));
}

#[tokio::test]
async fn test_blank_query_strings_do_not_cause_updates() {
    let (api, reconciler) = alarm_reconciler();
    let desired = MetricAlarmFields {
        alarm_name: "doubled".to_string(),
        comparison_operator: "GreaterThanThreshold".to_string(),
        evaluation_periods: 1,
        threshold: 10.0,
        metric_query: vec![
            MetricQueryFields {
                id: "e1".to_string(),
                expression: Some("m1 * 2".to_string()),
                label: Some(String::new()),
                return_data: true,
                metric: None,
            },
            MetricQueryFields {
                id: "m1".to_string(),
                expression: Some(String::new()),
                metric: Some(MetricStat {
                    metric_name: "RequestCount".to_string(),
                    namespace: Some(String::new()),
                    period: 60,
                    stat: "Sum".to_string(),
                    unit: Some(String::new()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let tracked = reconciler.create(&desired).await.unwrap();

    // 空文字は送信されない
    let stored = api.alarm("doubled").unwrap();
    assert!(stored.metrics.iter().all(|q| q.label.is_none()));
    let stat = stored
        .metrics
        .iter()
        .find_map(|q| q.metric_stat.as_ref())
        .unwrap();
    assert_eq!(stat.metric.namespace, None);
    assert_eq!(stat.unit, None);

    api.clear_calls();
    let (tracked, report) = reconciler.update(&tracked, &desired).await.unwrap();
    assert!(!report.has_mutations());
    let (_tracked, report) = reconciler.update(&tracked, &desired).await.unwrap();
    assert!(!report.has_mutations());
    assert_eq!(api.mutation_count(), 0);
}

#[tokio::test]
async fn test_enumerated_values_compare_case_insensitively() {
    let (api, reconciler) = alarm_reconciler();
    let mut desired = cpu_high();
    desired.treat_missing_data = "Breaching".to_string();
    desired.evaluate_low_sample_count_percentiles = Some("Evaluate".to_string());

    let tracked = reconciler.create(&desired).await.unwrap();
    assert_eq!(tracked.state.fields.treat_missing_data, "breaching");
    assert_eq!(
        tracked
            .state
            .fields
            .evaluate_low_sample_count_percentiles
            .as_deref(),
        Some("evaluate")
    );

    api.clear_calls();
    let (_fresh, report) = reconciler.update(&tracked, &desired).await.unwrap();
    assert!(!report.has_mutations());
    assert_eq!(api.mutation_count(), 0);
}

#[tokio::test]
async fn test_count_beyond_api_range_fails_before_any_call() {
    let (api, reconciler) = alarm_reconciler();
    let mut desired = cpu_high();
    desired.evaluation_periods = u32::MAX;

    assert!(reconciler.create(&desired).await.unwrap_err().is_validation());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_reconcile_all_continues_after_failure() {
    let (_api, reconciler) = alarm_reconciler();
    let mut invalid = cpu_high();
    invalid.alarm_name = "bad".to_string();
    invalid.statistic = None;
    let mut other = cpu_high();
    other.alarm_name = "cpu-high-b".to_string();

    let (outcomes, result) = reconciler
        .reconcile_all(vec![(None, Some(invalid)), (None, Some(other))])
        .await;

    assert!(!result.is_success());
    assert!(outcomes[0].is_absent());
    assert!(!outcomes[1].is_absent());
}

fn has_no_diff(
    reconciler: &Reconciler<MetricAlarmResource>,
    tracked: &Tracked<MetricAlarmState>,
    desired: &MetricAlarmFields,
) -> bool {
    reconciler.resource().diff(&tracked.state, desired).is_empty()
}
