//! Combinability of single reports.

#[path = "../common/mod.rs"]
mod common;

use common::{combined_report, count_report, numeric_variable, single_report};
use optimize_reports::model::{
    CustomBucket, DateUnit, DistributedBy, GroupBy, ReportData, ReportDefinition, ReportView,
    SingleReportData, VariableType, ViewEntity, ViewProperty, Visualization,
};
use optimize_reports::validation::{
    can_combine, check_combinable, NotCombinableReason, ShapeComponent, ValidationError,
};
use proptest::prelude::*;

fn arb_view() -> impl Strategy<Value = ReportView> {
    let entity = prop_oneof![
        Just(ViewEntity::ProcessInstance),
        Just(ViewEntity::FlowNode),
        Just(ViewEntity::UserTask),
    ];
    let property = prop_oneof![
        Just(ViewProperty::Frequency),
        Just(ViewProperty::Duration),
        Just(ViewProperty::RawData),
    ];
    (entity, property).prop_map(|(entity, property)| ReportView::new(entity, property))
}

fn arb_unit() -> impl Strategy<Value = DateUnit> {
    prop_oneof![
        Just(DateUnit::Automatic),
        Just(DateUnit::Day),
        Just(DateUnit::Month),
    ]
}

fn arb_group_by() -> impl Strategy<Value = GroupBy> {
    prop_oneof![
        Just(GroupBy::None),
        arb_unit().prop_map(|unit| GroupBy::StartDate { unit }),
        arb_unit().prop_map(|unit| GroupBy::EndDate { unit }),
        Just(GroupBy::Duration),
        Just(GroupBy::FlowNodes),
        Just(numeric_variable("amount")),
        Just(GroupBy::Variable {
            name: "region".to_string(),
            variable_type: VariableType::String,
        }),
    ]
}

fn arb_visualization() -> impl Strategy<Value = Visualization> {
    prop_oneof![
        Just(Visualization::Number),
        Just(Visualization::Bar),
        Just(Visualization::Line),
        Just(Visualization::Table),
    ]
}

fn arb_bucket() -> impl Strategy<Value = CustomBucket> {
    prop_oneof![
        Just(CustomBucket::default()),
        (1u32..4).prop_map(|size| CustomBucket::sized(f64::from(size) * 10.0, None)),
    ]
}

fn arb_report() -> impl Strategy<Value = SingleReportData> {
    (
        "[a-z]{1,8}",
        arb_view(),
        arb_group_by(),
        arb_visualization(),
        arb_bucket(),
        any::<bool>(),
    )
        .prop_map(|(key, view, group_by, visualization, bucket, hyper)| {
            let data = SingleReportData::new(key, view, group_by, visualization)
                .with_custom_bucket(bucket);
            if hyper {
                data.with_distributed_by(DistributedBy::FlowNode)
            } else {
                data
            }
        })
}

fn named(id: &str, name: &str, owner: Option<&str>, data: SingleReportData) -> ReportDefinition {
    let mut report = single_report(id, data);
    report.name = name.to_string();
    report.owner = owner.map(str::to_string);
    report
}

proptest! {
    /// Combinability does not depend on member order.
    #[test]
    fn combinability_is_symmetric(a in arb_report(), b in arb_report()) {
        prop_assert_eq!(can_combine(&[&a, &b]), can_combine(&[&b, &a]));
    }

    /// Ids, names and owners never decide combinability.
    #[test]
    fn combinability_ignores_identity(
        a in arb_report(),
        b in arb_report(),
        name_a in "[A-Za-z ]{0,12}",
        name_b in "[A-Za-z ]{0,12}",
        owner in proptest::option::of("[a-z]{3,6}"),
    ) {
        let first = [
            named("x", &name_a, owner.as_deref(), a.clone()),
            named("y", &name_b, None, b.clone()),
        ];
        let second = [
            named("p", "other", Some("someone"), a.clone()),
            named("q", "", owner.as_deref(), b.clone()),
        ];

        let first_refs: Vec<&ReportDefinition> = first.iter().collect();
        let second_refs: Vec<&ReportDefinition> = second.iter().collect();
        prop_assert_eq!(
            check_combinable(&first_refs).is_ok(),
            check_combinable(&second_refs).is_ok()
        );
        prop_assert_eq!(check_combinable(&first_refs).is_ok(), can_combine(&[&a, &b]));
    }

    /// The definition key a report reads from does not affect its shape.
    #[test]
    fn combinability_ignores_definition(a in arb_report(), key in "[a-z]{1,8}") {
        let mut b = a.clone();
        b.definition.key = key;
        prop_assert_eq!(can_combine(&[&a]), can_combine(&[&a, &b]));
    }
}

#[test]
fn test_date_groupings_combine_across_units() {
    let day = GroupBy::StartDate { unit: DateUnit::Day };
    let automatic = GroupBy::EndDate {
        unit: DateUnit::Automatic,
    };
    let a = count_report("a", "invoice", day, Visualization::Line);
    let b = count_report("b", "order", automatic, Visualization::Line);
    assert!(check_combinable(&[&a, &b]).is_ok());
}

#[test]
fn test_differing_visualization_rejected() {
    let a = count_report("a", "invoice", GroupBy::FlowNodes, Visualization::Bar);
    let b = count_report("b", "invoice", GroupBy::FlowNodes, Visualization::Pie);

    let err = check_combinable(&[&a, &b]).unwrap_err();
    assert_eq!(
        err,
        ValidationError::NotCombinable {
            report_id: "b".to_string(),
            reason: NotCombinableReason::Mismatch(ShapeComponent::Visualization),
        }
    );
}

#[test]
fn test_raw_data_never_combines() {
    let raw = single_report(
        "raw",
        SingleReportData::new(
            "invoice",
            ReportView::new(ViewEntity::ProcessInstance, ViewProperty::RawData),
            GroupBy::None,
            Visualization::Table,
        ),
    );
    let table = count_report("t", "invoice", GroupBy::None, Visualization::Table);

    let err = check_combinable(&[&table, &raw]).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::NotCombinable {
            reason: NotCombinableReason::RawData,
            ..
        }
    ));
    assert!(check_combinable(&[&raw]).is_err());
}

#[test]
fn test_numeric_bucket_sizes_must_match() {
    let a = single_report(
        "a",
        SingleReportData::new(
            "invoice",
            ReportView::new(ViewEntity::ProcessInstance, ViewProperty::Frequency),
            numeric_variable("amount"),
            Visualization::Bar,
        )
        .with_custom_bucket(CustomBucket::sized(10.0, Some(0.0))),
    );
    let mut b = a.clone();
    b.id = "b".to_string();
    if let ReportData::SingleProcess(data) = &mut b.data {
        data.configuration.custom_bucket = CustomBucket::sized(50.0, Some(0.0));
    }

    let err = check_combinable(&[&a, &b]).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"Reports not combinable: report 'b' differs from the first report in its bucket configuration"
    );
}

#[test]
fn test_combined_reports_cannot_be_nested() {
    let a = count_report("a", "invoice", GroupBy::FlowNodes, Visualization::Bar);
    let nested = combined_report("c", &["a"]);

    let err = check_combinable(&[&a, &nested]).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::NotCombinable {
            reason: NotCombinableReason::CombinedMember,
            ..
        }
    ));
}

#[test]
fn test_user_task_duration_time_may_differ() {
    let data = SingleReportData::new(
        "invoice",
        ReportView::new(ViewEntity::UserTask, ViewProperty::Duration),
        GroupBy::UserTasks,
        Visualization::Bar,
    );
    let mut idle = data.clone();
    idle.configuration.user_task_duration_time =
        optimize_reports::model::UserTaskDurationTime::Idle;

    assert!(can_combine(&[&data, &idle]));
}
