// src/model/filter.rs
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::model::report::VariableType;

/// A filter narrowing the instances a report evaluates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReportFilter {
    Variable {
        name: String,
        variable_type: VariableType,
        data: VariableFilterData,
    },
    InstanceState {
        state: InstanceStateFilter,
    },
    StartDate {
        range: DateRange,
    },
    EndDate {
        range: DateRange,
    },
    Duration {
        operator: ComparisonOperator,
        value_ms: u64,
    },
    ExecutedFlowNodes {
        operator: MembershipOperator,
        values: Vec<String>,
    },
}

impl ReportFilter {
    /// Variable filter matching any of `values`.
    pub fn variable_in<I, S>(name: impl Into<String>, variable_type: VariableType, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReportFilter::Variable {
            name: name.into(),
            variable_type,
            data: VariableFilterData {
                operator: VariableOperator::In,
                values: values.into_iter().map(Into::into).collect(),
                include_undefined: false,
            },
        }
    }

    pub fn state(state: InstanceStateFilter) -> Self {
        ReportFilter::InstanceState { state }
    }

    /// Name of the variable this filter targets, if any.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            ReportFilter::Variable { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Short label used in logs and filter outcomes.
    pub fn label(&self) -> String {
        match self {
            ReportFilter::Variable { name, .. } => format!("variable '{}'", name),
            ReportFilter::InstanceState { state } => format!("instance state {:?}", state),
            ReportFilter::StartDate { .. } => "start date".to_string(),
            ReportFilter::EndDate { .. } => "end date".to_string(),
            ReportFilter::Duration { .. } => "duration".to_string(),
            ReportFilter::ExecutedFlowNodes { .. } => "executed flow nodes".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableFilterData {
    pub operator: VariableOperator,
    #[serde(default)]
    pub values: Vec<String>,
    /// Whether instances without the variable pass the filter.
    #[serde(default)]
    pub include_undefined: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableOperator {
    In,
    NotIn,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstanceStateFilter {
    Running,
    Completed,
    Canceled,
    Suspended,
    NonSuspended,
}

/// Inclusive date range; open ends are unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}

impl DateRange {
    pub fn contains(&self, date: &DateTime<FixedOffset>) -> bool {
        self.start.map_or(true, |start| *date >= start)
            && self.end.map_or(true, |end| *date <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    GreaterThan,
    LessThan,
}

impl ComparisonOperator {
    pub fn holds(&self, actual: f64, expected: f64) -> bool {
        match self {
            ComparisonOperator::GreaterThan => actual > expected,
            ComparisonOperator::LessThan => actual < expected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MembershipOperator {
    In,
    NotIn,
}
