//! Combined evaluation over the in-memory evaluator.

#[path = "../common/mod.rs"]
mod common;

use common::{count_report, evaluator, single_report};
use optimize_reports::evaluation::CombinedEvaluator;
use optimize_reports::model::{
    BucketedResult, DateUnit, GroupBy, InstanceStateFilter, ReportData, ReportDefinition,
    ReportFilter, ReportView, SingleReportData, VariableType, ViewEntity, ViewProperty,
    Visualization,
};

fn by_start_day(id: &str, definition: &str) -> ReportDefinition {
    count_report(
        id,
        definition,
        GroupBy::StartDate { unit: DateUnit::Day },
        Visualization::Bar,
    )
}

fn with_stored_filter(mut report: ReportDefinition, filter: ReportFilter) -> ReportDefinition {
    if let ReportData::SingleProcess(data) = &mut report.data {
        data.filters.push(filter);
    }
    report
}

/// Buckets that hold a value, in axis order.
fn filled(map: &BucketedResult) -> Vec<(String, f64)> {
    map.keys()
        .into_iter()
        .zip(map.values())
        .filter_map(|(key, value)| Some((key.to_string(), value?)))
        .collect()
}

#[test]
fn test_split_members_count_each_instance_once() {
    let suspended = with_stored_filter(
        by_start_day("suspended", "invoice"),
        ReportFilter::state(InstanceStateFilter::Suspended),
    );
    let others = with_stored_filter(
        by_start_day("others", "invoice"),
        ReportFilter::state(InstanceStateFilter::NonSuspended),
    );
    let evaluator = evaluator();

    let result = CombinedEvaluator::new(&evaluator).evaluate(&[suspended, others], &[]);

    assert_eq!(result.instance_count, 4);
    assert_eq!(result.get("suspended").unwrap().instance_count, 1);
    assert_eq!(result.get("others").unwrap().instance_count, 3);

    let suspended = result.get("suspended").unwrap().map().unwrap();
    let others = result.get("others").unwrap().map().unwrap();
    assert_eq!(suspended.keys(), others.keys());
    assert_eq!(
        suspended.keys(),
        vec![
            "2024-01-02T00:00:00.000+0000",
            "2024-01-03T00:00:00.000+0000",
            "2024-01-04T00:00:00.000+0000",
            "2024-01-05T00:00:00.000+0000",
        ]
    );
    assert_eq!(suspended.values(), vec![None, None, None, Some(1.0)]);
    assert_eq!(others.values(), vec![Some(1.0), Some(1.0), Some(0.0), Some(1.0)]);
}

#[test]
fn test_variable_filter_only_reaches_members_that_declare_it() {
    let members = [by_start_day("invoices", "invoice"), by_start_day("orders", "order")];
    let unmatched = ReportFilter::variable_in("amount", VariableType::Double, ["999"]);
    let evaluator = evaluator();
    let engine = CombinedEvaluator::new(&evaluator);

    let plain = engine.evaluate(&members, &[]);
    let filtered = engine.evaluate(&members, &[unmatched.clone()]);

    let orders = filtered.get("orders").unwrap();
    assert_eq!(orders.filters.skipped.len(), 1);
    assert!(orders.filters.applied.is_empty());
    assert_eq!(orders.instance_count, 3);
    // The axis shrinks to the orders range; the orders buckets themselves do not change.
    assert_eq!(
        filled(orders.map().unwrap()),
        filled(plain.get("orders").unwrap().map().unwrap())
    );

    let before = plain.get("invoices").unwrap().map().unwrap();
    assert!(before.values().iter().any(Option::is_some));

    let invoices = filtered.get("invoices").unwrap();
    assert_eq!(invoices.filters.applied, vec![unmatched]);
    assert_eq!(invoices.instance_count, 0);
    let invoices = invoices.map().unwrap();
    assert_eq!(invoices.keys(), orders.map().unwrap().keys());
    assert_eq!(invoices.len(), 4);
    assert!(invoices.values().iter().all(Option::is_none));

    assert_eq!(filtered.instance_count, 3);
    assert!(filtered.excluded.is_empty());
}

#[test]
fn test_no_matching_instances_is_null_not_zero() {
    let members = [
        with_stored_filter(
            by_start_day("canceled", "invoice"),
            ReportFilter::state(InstanceStateFilter::Canceled),
        ),
        by_start_day("all", "invoice"),
    ];
    let evaluator = evaluator();

    let result = CombinedEvaluator::new(&evaluator).evaluate(&members, &[]);

    let canceled = result.get("canceled").unwrap().map().unwrap();
    assert_eq!(canceled.len(), 4);
    assert!(canceled.values().iter().all(Option::is_none));
    assert_eq!(result.instance_count, 4);
}

#[test]
fn test_unknown_definition_excluded() {
    let members = [
        by_start_day("invoices", "invoice"),
        by_start_day("payments", "payment"),
        by_start_day("orders", "order"),
    ];
    let evaluator = evaluator();

    let result = CombinedEvaluator::new(&evaluator).evaluate(&members, &[]);

    assert_eq!(result.member_ids(), vec!["invoices", "orders"]);
    assert_eq!(result.excluded.len(), 1);
    assert_eq!(result.excluded[0].report_id, "payments");
    assert!(result.excluded[0].reason.contains("payment"));
    assert_eq!(result.instance_count, 7);

    // 2024-01-02 through 2024-03-04
    let keys = result.get("orders").unwrap().map().unwrap().keys();
    assert_eq!(keys.len(), 63);
    assert_eq!(keys[0], "2024-01-02T00:00:00.000+0000");
}

#[test]
fn test_drifted_member_excluded() {
    let line = count_report(
        "line",
        "order",
        GroupBy::StartDate { unit: DateUnit::Day },
        Visualization::Line,
    );
    let members = [by_start_day("invoices", "invoice"), line];
    let evaluator = evaluator();

    let result = CombinedEvaluator::new(&evaluator).evaluate(&members, &[]);

    assert_eq!(result.member_ids(), vec!["invoices"]);
    assert_eq!(result.excluded[0].report_id, "line");
    assert_eq!(result.instance_count, 4);
}

#[test]
fn test_flow_node_members_share_declared_nodes() {
    let by_node = |id: &str, definition: &str| {
        single_report(
            id,
            SingleReportData::new(
                definition,
                ReportView::new(ViewEntity::FlowNode, ViewProperty::Frequency),
                GroupBy::FlowNodes,
                Visualization::Table,
            ),
        )
    };
    let invoices = by_node("invoices", "invoice");
    let orders = by_node("orders", "order");
    let evaluator = evaluator();

    let result = CombinedEvaluator::new(&evaluator).evaluate(&[invoices, orders], &[]);

    let keys = result.get("invoices").unwrap().map().unwrap().keys();
    assert_eq!(keys, vec!["start", "approve", "end", "ship"]);
    assert_eq!(
        result.get("orders").unwrap().map().unwrap().get("approve"),
        None
    );
}
