//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use optimize_reports::evaluation::{
    FlowNodeInstance, InMemoryEvaluator, InstanceState, ProcessDataSet, ProcessDefinitionSchema,
    ProcessInstance,
};
use optimize_reports::model::{
    CombinedReportData, GroupBy, ReportData, ReportDefinition, ReportView, SingleReportData,
    VariableType, ViewEntity, ViewProperty, Visualization,
};

pub fn date(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

/// Single process report counting instances of `definition`.
pub fn count_report(
    id: &str,
    definition: &str,
    group_by: GroupBy,
    visualization: Visualization,
) -> ReportDefinition {
    single_report(
        id,
        SingleReportData::new(
            definition,
            ReportView::new(ViewEntity::ProcessInstance, ViewProperty::Frequency),
            group_by,
            visualization,
        ),
    )
}

pub fn single_report(id: &str, data: SingleReportData) -> ReportDefinition {
    ReportDefinition {
        id: id.to_string(),
        name: format!("Report {}", id),
        owner: None,
        collection_id: None,
        last_modified: None,
        data: ReportData::SingleProcess(data),
    }
}

pub fn combined_report(id: &str, members: &[&str]) -> ReportDefinition {
    ReportDefinition {
        id: id.to_string(),
        name: format!("Combined {}", id),
        owner: None,
        collection_id: None,
        last_modified: None,
        data: ReportData::Combined(CombinedReportData::from_ids(members.iter().copied())),
    }
}

pub fn numeric_variable(name: &str) -> GroupBy {
    GroupBy::Variable {
        name: name.to_string(),
        variable_type: VariableType::Double,
    }
}

pub fn instance(id: &str, definition: &str, start: &str, state: InstanceState) -> ProcessInstance {
    ProcessInstance {
        id: id.to_string(),
        definition_key: definition.to_string(),
        definition_version: "1".to_string(),
        tenant_id: None,
        start_date: date(start),
        end_date: None,
        state,
        variables: BTreeMap::new(),
        flow_nodes: Vec::new(),
    }
}

pub fn completed(id: &str, definition: &str, start: &str, end: &str) -> ProcessInstance {
    let mut instance = instance(id, definition, start, InstanceState::Completed);
    instance.end_date = Some(date(end));
    instance
}

pub fn with_variable(
    mut instance: ProcessInstance,
    name: &str,
    value: serde_json::Value,
) -> ProcessInstance {
    instance.variables.insert(name.to_string(), value);
    instance
}

pub fn with_flow_nodes(mut instance: ProcessInstance, nodes: &[(&str, u64)]) -> ProcessInstance {
    instance.flow_nodes = nodes
        .iter()
        .map(|(id, ms)| FlowNodeInstance {
            id: id.to_string(),
            duration_ms: Some(*ms),
        })
        .collect();
    instance
}

/// Invoice and order processes with a handful of instances.
///
/// - invoice: 4 instances in January 2024 (one suspended), `amount` declared
/// - order: 3 instances in March 2024, no variables
pub fn process_data() -> ProcessDataSet {
    ProcessDataSet {
        definitions: vec![
            ProcessDefinitionSchema::new("invoice")
                .with_variable("amount", VariableType::Double)
                .with_flow_nodes(["start", "approve", "end"]),
            ProcessDefinitionSchema::new("order").with_flow_nodes(["start", "ship", "end"]),
        ],
        instances: vec![
            with_variable(
                completed("inv-1", "invoice", "2024-01-02T10:00:00Z", "2024-01-02T10:00:05Z"),
                "amount",
                serde_json::json!(120.0),
            ),
            with_variable(
                completed("inv-2", "invoice", "2024-01-03T09:00:00Z", "2024-01-03T09:00:20Z"),
                "amount",
                serde_json::json!(80.0),
            ),
            with_variable(
                instance("inv-3", "invoice", "2024-01-05T12:00:00Z", InstanceState::Suspended),
                "amount",
                serde_json::json!(300.0),
            ),
            with_variable(
                instance("inv-4", "invoice", "2024-01-05T15:30:00Z", InstanceState::Active),
                "amount",
                serde_json::json!(45.0),
            ),
            completed("ord-1", "order", "2024-03-01T08:00:00Z", "2024-03-01T09:00:00Z"),
            completed("ord-2", "order", "2024-03-02T08:00:00Z", "2024-03-02T08:30:00Z"),
            instance("ord-3", "order", "2024-03-04T08:00:00Z", InstanceState::Active),
        ],
    }
}

pub fn evaluator() -> InMemoryEvaluator {
    InMemoryEvaluator::new(process_data())
}
