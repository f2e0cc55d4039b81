//! Shared bucket axes across combined members.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use optimize_reports::model::{BucketedResult, CustomBucket, DateUnit};
use optimize_reports::reconcile::{
    AxisKind, AxisStrategy, CategoricalAxis, DateAxis, NumericAxis, ReconciledAxis,
    DATE_KEY_FORMAT,
};
use proptest::prelude::*;

fn members(keys: &[&[&str]]) -> Vec<BucketedResult> {
    keys.iter()
        .map(|keys| BucketedResult::from_pairs(keys.iter().map(|k| (k.to_string(), Some(1.0)))))
        .collect()
}

fn day_key(offset_days: i64) -> String {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    (start + Duration::days(offset_days))
        .and_utc()
        .fixed_offset()
        .format(DATE_KEY_FORMAT)
        .to_string()
}

fn assert_shared_axis(axis: &ReconciledAxis, inputs: &[BucketedResult]) {
    let keys = axis.keys();
    for result in &axis.results {
        assert_eq!(result.keys(), keys);
    }
    let longest = inputs.iter().map(BucketedResult::len).max().unwrap_or(0);
    assert!(keys.len() >= longest);
}

#[test]
fn test_disjoint_ranges_merge_into_one_span() {
    let inputs = members(&[&["1000", "2000"], &["8000", "10000"]]);
    let axis = AxisStrategy::for_kind(AxisKind::Numeric, 1000).reconcile(&inputs);

    let keys = axis.keys();
    assert_eq!(keys.len(), 10);
    assert_eq!(keys.first(), Some(&"1000"));
    assert_eq!(keys.last(), Some(&"10000"));
    assert_eq!(keys[4], "5000");
    assert_eq!(axis.results[0].get("1000"), Some(1.0));
    assert_eq!(axis.results[0].get("5000"), None);
    assert_eq!(axis.results[1].get("10000"), Some(1.0));
    assert!(axis.is_complete);
}

#[test]
fn test_outer_range_floors_to_power_of_ten() {
    let inputs = members(&[
        &["60000", "70000", "80000"],
        &["50000", "60000", "70000", "80000", "90000", "100000"],
    ]);
    let axis = AxisStrategy::for_kind(AxisKind::Numeric, 1000).reconcile(&inputs);

    let keys = axis.keys();
    assert_eq!(keys.len(), 10);
    assert_eq!(keys.first(), Some(&"10000"));
    assert_eq!(keys.last(), Some(&"100000"));
    assert_eq!(axis.results[1].get("10000"), None);
}

#[test]
fn test_empty_member_padded_with_nulls() {
    let inputs = members(&[&["10", "20", "30"], &[]]);
    let axis = NumericAxis::new(1000).reconcile(&inputs);

    assert_eq!(axis.results[1].keys(), vec!["10", "20", "30"]);
    assert!(axis.results[1].values().iter().all(Option::is_none));
}

#[test]
fn test_custom_bucket_sets_width_and_baseline() {
    let inputs = members(&[&["12", "37"], &["55"]]);
    let axis = NumericAxis::new(1000)
        .with_custom_bucket(CustomBucket::sized(25.0, Some(0.0)))
        .reconcile(&inputs);

    assert_eq!(axis.keys(), vec!["0", "25", "50"]);
    assert_eq!(axis.results[0].values(), vec![Some(1.0), Some(1.0), None]);
    assert_eq!(axis.results[1].values(), vec![None, None, Some(1.0)]);
}

#[test]
fn test_daily_members_share_calendar_axis() {
    let inputs = vec![
        BucketedResult::from_pairs([(day_key(0), Some(3.0)), (day_key(1), Some(1.0))]),
        BucketedResult::from_pairs([(day_key(4), Some(2.0))]),
    ];
    let axis = DateAxis::new(1000)
        .with_unit(Some(DateUnit::Day))
        .reconcile(&inputs);

    assert_eq!(axis.keys().len(), 5);
    assert_eq!(axis.keys()[0], day_key(0));
    assert_eq!(axis.results[0].get(&day_key(2)), None);
    assert_eq!(axis.results[1].get(&day_key(4)), Some(2.0));
}

#[test]
fn test_summer_time_member_keeps_its_buckets() {
    let winter = BucketedResult::from_pairs([
        ("2024-03-01T00:00:00.000+0000", Some(2.0)),
        ("2024-04-01T00:00:00.000+0000", Some(3.0)),
    ]);
    let summer = BucketedResult::from_pairs([
        ("2024-04-01T00:00:00.000+0200", Some(7.0)),
        ("2024-05-01T00:00:00.000+0200", Some(9.0)),
    ]);
    let inputs = vec![winter, summer];
    let axis = DateAxis::new(1000)
        .with_unit(Some(DateUnit::Month))
        .reconcile(&inputs);

    assert_eq!(
        axis.keys(),
        vec![
            "2024-03-01T00:00:00.000+0000",
            "2024-04-01T00:00:00.000+0000",
            "2024-05-01T00:00:00.000+0200",
        ]
    );
    assert_eq!(axis.results[0].values(), vec![Some(2.0), Some(3.0), None]);
    assert_eq!(axis.results[1].values(), vec![None, Some(7.0), Some(9.0)]);
    assert_shared_axis(&axis, &inputs);
}

#[test]
fn test_categories_keep_first_seen_order() {
    let inputs = members(&[&["approve", "start"], &["start", "ship", "end"]]);
    let axis = CategoricalAxis::new(1000).reconcile(&inputs);

    assert_eq!(axis.keys(), vec!["approve", "start", "ship", "end"]);
    assert_eq!(axis.results[0].get("ship"), None);
}

#[test]
fn test_axis_truncated_at_limit() {
    let inputs = members(&[&["1", "2"], &["500"]]);
    let axis = AxisStrategy::for_kind(AxisKind::Numeric, 50).reconcile(&inputs);

    assert_eq!(axis.keys().len(), 50);
    assert!(!axis.is_complete);
    assert_eq!(axis.results[1].values().iter().flatten().count(), 0);
}

fn arb_key_sets<T: Strategy>(element: T) -> impl Strategy<Value = Vec<BTreeSet<T::Value>>>
where
    T::Value: Ord,
{
    prop::collection::vec(prop::collection::btree_set(element, 1..12), 1..4)
}

proptest! {
    /// Every member ends up on the same key sequence, at least as long as
    /// the longest member.
    #[test]
    fn numeric_axis_covers_all_members(sets in arb_key_sets(1u32..50)) {
        let inputs: Vec<BucketedResult> = sets
            .iter()
            .map(|set| {
                BucketedResult::from_pairs(set.iter().map(|k| ((k * 10).to_string(), Some(1.0))))
            })
            .collect();
        let axis = NumericAxis::new(1000).reconcile(&inputs);

        let keys = axis.keys();
        for result in &axis.results {
            prop_assert_eq!(result.keys(), keys.clone());
        }
        let longest = inputs.iter().map(BucketedResult::len).max().unwrap_or(0);
        prop_assert!(keys.len() >= longest);
        for (input, output) in inputs.iter().zip(&axis.results) {
            let kept = output.values().iter().flatten().count();
            prop_assert_eq!(kept, input.len());
        }
    }

    #[test]
    fn date_axis_covers_all_members(sets in arb_key_sets(0i64..60)) {
        let inputs: Vec<BucketedResult> = sets
            .iter()
            .map(|set| BucketedResult::from_pairs(set.iter().map(|d| (day_key(*d), Some(1.0)))))
            .collect();
        let axis = DateAxis::new(1000).reconcile(&inputs);

        let keys = axis.keys();
        for result in &axis.results {
            prop_assert_eq!(result.keys(), keys.clone());
        }
        let longest = inputs.iter().map(BucketedResult::len).max().unwrap_or(0);
        prop_assert!(keys.len() >= longest);
    }

    #[test]
    fn categorical_axis_is_the_union(sets in arb_key_sets("[a-f]{1,2}")) {
        let inputs: Vec<BucketedResult> = sets
            .iter()
            .map(|set| BucketedResult::from_pairs(set.iter().map(|k| (k.clone(), Some(1.0)))))
            .collect();
        let axis = CategoricalAxis::new(1000).reconcile(&inputs);

        assert_shared_axis(&axis, &inputs);
        let union: BTreeSet<&str> = sets.iter().flatten().map(String::as_str).collect();
        prop_assert_eq!(axis.keys().len(), union.len());
    }
}
