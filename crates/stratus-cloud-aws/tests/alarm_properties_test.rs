//! Property-based tests for metric alarm validation and round-trips

mod common;

use common::{alarm_reconciler, cpu_high};
use proptest::prelude::*;
use stratus_cloud::Resource;
use stratus_cloud_aws::{MetricAlarmConfig, MetricAlarmFields};

fn statistic() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        prop::sample::select(vec!["Average", "Sum", "Maximum", "Minimum", "SampleCount"])
            .prop_map(|s| Some(s.to_string())),
    ]
}

fn extended_statistic() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        (1u32..100).prop_map(|p| Some(format!("p{}", p))),
    ]
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

fn valid_alarm() -> impl Strategy<Value = MetricAlarmFields> {
    (
        "[a-z][a-z0-9-]{0,20}",
        1u32..10,
        -1000.0f64..1000.0,
        prop::option::of(prop::sample::select(vec![60u32, 120, 300, 3600])),
        prop::collection::btree_map("[A-Za-z]{1,10}", "[a-z0-9-]{1,12}", 0..4),
        prop::bool::ANY,
        prop::sample::select(vec!["breaching", "notBreaching", "ignore", "missing"]),
    )
        .prop_map(
            |(name, periods, threshold, period, dimensions, percentile, missing)| {
                let mut fields = cpu_high();
                fields.alarm_name = name;
                fields.evaluation_periods = periods;
                fields.threshold = threshold;
                fields.period = period;
                fields.dimensions = dimensions;
                fields.treat_missing_data = missing.to_string();
                if percentile {
                    fields.statistic = None;
                    fields.extended_statistic = Some("p95".to_string());
                }
                fields
            },
        )
}

proptest! {
    /// Exactly one of `statistic` / `extended_statistic` must be set
    #[test]
    fn prop_statistic_choice_is_exclusive(
        statistic in statistic(),
        extended in extended_statistic(),
    ) {
        let mut fields = cpu_high();
        fields.statistic = statistic.clone();
        fields.extended_statistic = extended.clone();

        let result = MetricAlarmConfig::try_from(&fields);
        let exactly_one = is_set(&statistic) != is_set(&extended);

        prop_assert_eq!(result.is_ok(), exactly_one);
        if let Err(e) = result {
            prop_assert!(e.is_validation());
        }
    }

    /// An invalid alarm never reaches the API
    #[test]
    fn prop_invalid_alarm_issues_no_calls(
        statistic in statistic(),
        extended in extended_statistic(),
    ) {
        prop_assume!(is_set(&statistic) == is_set(&extended));

        let (api, reconciler) = alarm_reconciler();
        let mut fields = cpu_high();
        fields.statistic = statistic;
        fields.extended_statistic = extended;

        let result = tokio_test::block_on(reconciler.create(&fields));
        prop_assert!(result.is_err());
        prop_assert!(api.calls().is_empty());
    }

    /// Whatever was created reads back as no diff
    #[test]
    fn prop_created_alarm_has_no_diff(fields in valid_alarm()) {
        let (api, reconciler) = alarm_reconciler();

        let tracked = tokio_test::block_on(reconciler.create(&fields)).unwrap();

        prop_assert_eq!(&tracked.state.fields, &fields);
        prop_assert!(reconciler.resource().diff(&tracked.state, &fields).is_empty());

        api.clear_calls();
        let (_fresh, report) = tokio_test::block_on(reconciler.update(&tracked, &fields)).unwrap();
        prop_assert!(!report.has_mutations());
        prop_assert_eq!(api.mutation_count(), 0);
    }
}
