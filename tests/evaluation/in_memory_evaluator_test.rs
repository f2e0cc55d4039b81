//! In-memory single report evaluation over the shared fixture.

#[path = "../common/mod.rs"]
mod common;

use common::{
    count_report, evaluator, instance, numeric_variable, process_data, single_report,
    with_flow_nodes,
};
use optimize_reports::evaluation::{
    EvaluationError, InMemoryEvaluator, InstanceState, ProcessDataSet, SingleReportEvaluator,
};
use optimize_reports::model::{
    ComparisonOperator, DateRange, DateUnit, DistributedBy, GroupBy, InstanceStateFilter,
    MembershipOperator, ReportData, ReportDefinition, ReportFilter, ReportView, ResultData,
    SingleReportData, VariableFilterData, VariableOperator, VariableType, ViewEntity,
    ViewProperty, Visualization,
};

fn number_report(id: &str, definition: &str) -> ReportDefinition {
    count_report(id, definition, GroupBy::None, Visualization::Number)
}

fn view_report(definition: &str, view: ReportView, group_by: GroupBy) -> ReportDefinition {
    single_report(
        "r",
        SingleReportData::new(definition, view, group_by, Visualization::Table),
    )
}

/// Fixture where the completed invoices also record their flow nodes.
fn with_executed_nodes() -> InMemoryEvaluator {
    let mut data = process_data();
    for instance in &mut data.instances {
        let nodes: &[(&str, u64)] = match instance.id.as_str() {
            "inv-1" => &[("start", 0), ("approve", 4000), ("end", 0)],
            "inv-2" => &[("start", 0), ("end", 0)],
            _ => continue,
        };
        *instance = with_flow_nodes(instance.clone(), nodes);
    }
    InMemoryEvaluator::new(data)
}

#[test]
fn test_dataset_loads_from_json() {
    let json = r#"{
        "definitions": [
            { "key": "invoice", "variables": { "amount": "double" }, "flowNodes": ["start", "end"] }
        ],
        "instances": [
            {
                "id": "inv-1",
                "definitionKey": "invoice",
                "startDate": "2024-01-02T10:00:00Z",
                "endDate": "2024-01-02T10:00:05Z",
                "state": "completed",
                "variables": { "amount": 120 }
            }
        ]
    }"#;

    let data: ProcessDataSet = serde_json::from_str(json).unwrap();
    assert_eq!(data.instances[0].definition_version, "1");
    assert_eq!(data.instances[0].duration_ms(), Some(5000.0));
    assert_eq!(data.definitions[0].variables.get("amount"), Some(&VariableType::Double));
    assert!(data.definitions[0].versions.is_empty());

    let result = InMemoryEvaluator::new(data)
        .evaluate(&number_report("n", "invoice"), &[])
        .unwrap();
    assert_eq!(result.data, ResultData::Number(Some(1.0)));
}

#[test]
fn test_automatic_start_date_picks_hours() {
    let report = count_report(
        "r",
        "invoice",
        GroupBy::StartDate {
            unit: DateUnit::Automatic,
        },
        Visualization::Bar,
    );
    let result = evaluator().evaluate(&report, &[]).unwrap();

    // 2024-01-02 10:00 through 2024-01-05 15:00, hourly
    let map = result.data.as_map().unwrap();
    assert_eq!(map.len(), 78);
    assert_eq!(map.keys()[0], "2024-01-02T10:00:00.000+0000");
    assert_eq!(map.values().iter().flatten().sum::<f64>(), 4.0);
    assert!(map.is_complete);
}

#[test]
fn test_amount_grouping_floors_to_power_of_ten() {
    let report = count_report("r", "invoice", numeric_variable("amount"), Visualization::Bar);
    let result = evaluator().evaluate(&report, &[]).unwrap();

    let map = result.data.as_map().unwrap();
    assert_eq!(map.len(), 30);
    assert_eq!(map.keys()[0], "10");
    assert_eq!(map.get("40"), Some(1.0));
    assert_eq!(map.get("50"), Some(0.0));
    assert_eq!(map.get("80"), Some(1.0));
    assert_eq!(map.get("120"), Some(1.0));
    assert_eq!(map.get("300"), Some(1.0));
}

#[test]
fn test_greater_than_variable_filter() {
    let filter = ReportFilter::Variable {
        name: "amount".to_string(),
        variable_type: VariableType::Double,
        data: VariableFilterData {
            operator: VariableOperator::GreaterThan,
            values: vec!["100".to_string()],
            include_undefined: false,
        },
    };
    let result = evaluator()
        .evaluate(&number_report("n", "invoice"), &[filter])
        .unwrap();

    assert_eq!(result.data, ResultData::Number(Some(2.0)));
    let ids: Vec<&str> = result.instance_ids.iter().map(String::as_str).collect();
    assert_eq!(ids, vec!["inv-1", "inv-3"]);
}

#[test]
fn test_duration_view_ignores_running_instances() {
    let report = view_report(
        "invoice",
        ReportView::new(ViewEntity::ProcessInstance, ViewProperty::Duration),
        GroupBy::None,
    );
    let result = evaluator().evaluate(&report, &[]).unwrap();

    assert_eq!(result.data, ResultData::Number(Some(12500.0)));
    assert_eq!(result.instance_count(), 4);
}

#[test]
fn test_date_and_duration_filters() {
    let evaluator = evaluator();
    let orders = number_report("n", "order");

    let from_march_second = ReportFilter::StartDate {
        range: DateRange {
            start: Some(common::date("2024-03-02T00:00:00Z")),
            end: None,
        },
    };
    let result = evaluator.evaluate(&orders, &[from_march_second]).unwrap();
    assert_eq!(result.data, ResultData::Number(Some(2.0)));

    let longer_than_45_minutes = ReportFilter::Duration {
        operator: ComparisonOperator::GreaterThan,
        value_ms: 45 * 60 * 1000,
    };
    let result = evaluator.evaluate(&orders, &[longer_than_45_minutes]).unwrap();
    assert_eq!(result.data, ResultData::Number(Some(1.0)));

    let running = ReportFilter::state(InstanceStateFilter::Running);
    let result = evaluator
        .evaluate(&number_report("n", "invoice"), &[running])
        .unwrap();
    assert_eq!(result.data, ResultData::Number(Some(2.0)));
}

#[test]
fn test_executed_flow_nodes_filter() {
    let evaluator = with_executed_nodes();
    let invoices = number_report("n", "invoice");

    let approved = ReportFilter::ExecutedFlowNodes {
        operator: MembershipOperator::In,
        values: vec!["approve".to_string()],
    };
    let result = evaluator.evaluate(&invoices, &[approved.clone()]).unwrap();
    assert_eq!(result.data, ResultData::Number(Some(1.0)));
    assert!(evaluator.applicability(&invoices, &approved).is_applicable());

    let shipped = ReportFilter::ExecutedFlowNodes {
        operator: MembershipOperator::NotIn,
        values: vec!["ship".to_string()],
    };
    assert!(!evaluator.applicability(&invoices, &shipped).is_applicable());
    assert!(evaluator
        .applicability(&number_report("o", "order"), &shipped)
        .is_applicable());
}

#[test]
fn test_flow_node_duration_by_node() {
    let report = view_report(
        "invoice",
        ReportView::new(ViewEntity::FlowNode, ViewProperty::Duration),
        GroupBy::FlowNodes,
    );
    let result = with_executed_nodes().evaluate(&report, &[]).unwrap();

    let map = result.data.as_map().unwrap();
    assert_eq!(map.keys(), vec!["start", "approve", "end"]);
    assert_eq!(map.values(), vec![Some(0.0), Some(4000.0), Some(0.0)]);
}

#[test]
fn test_raw_data_lists_matching_instances() {
    let report = view_report(
        "invoice",
        ReportView::new(ViewEntity::ProcessInstance, ViewProperty::RawData),
        GroupBy::None,
    );
    let completed = ReportFilter::state(InstanceStateFilter::Completed);
    let result = evaluator().evaluate(&report, &[completed]).unwrap();

    let ResultData::Raw(rows) = result.data else {
        panic!("expected raw rows");
    };
    let ids: Vec<&str> = rows.iter().map(|r| r.instance_id.as_str()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-2"]);
    assert_eq!(rows[0].start_date, "2024-01-02T10:00:00.000+0000");
    assert_eq!(rows[0].end_date.as_deref(), Some("2024-01-02T10:00:05.000+0000"));
}

#[test]
fn test_latest_version_selector() {
    let mut data = process_data();
    data.definitions[0].versions = vec!["1".to_string(), "2".to_string()];
    let mut newer = instance("inv-5", "invoice", "2024-01-06T08:00:00Z", InstanceState::Active);
    newer.definition_version = "2".to_string();
    data.instances.push(newer);
    let evaluator = InMemoryEvaluator::new(data);

    let mut report = number_report("n", "invoice");
    assert_eq!(
        evaluator.evaluate(&report, &[]).unwrap().data,
        ResultData::Number(Some(5.0))
    );

    if let ReportData::SingleProcess(data) = &mut report.data {
        data.definition.versions = vec!["latest".to_string()];
    }
    let result = evaluator.evaluate(&report, &[]).unwrap();
    assert_eq!(result.data, ResultData::Number(Some(1.0)));
    assert!(result.instance_ids.contains("inv-5"));
}

#[test]
fn test_second_level_grouping_unsupported() {
    let report = single_report(
        "hyper",
        SingleReportData::new(
            "invoice",
            ReportView::new(ViewEntity::FlowNode, ViewProperty::Frequency),
            GroupBy::StartDate { unit: DateUnit::Day },
            Visualization::Bar,
        )
        .with_distributed_by(DistributedBy::FlowNode),
    );
    let err = evaluator().evaluate(&report, &[]).unwrap_err();
    assert!(matches!(err, EvaluationError::Unsupported(_)));
}
