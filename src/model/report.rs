// src/model/report.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::filter::ReportFilter;

/// A stored report definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    /// Owning collection; `None` means the report is private.
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    pub data: ReportData,
}

impl ReportDefinition {
    pub fn kind(&self) -> ReportKind {
        self.data.kind()
    }

    /// The single-report payload, for both process and decision reports.
    pub fn single(&self) -> Option<&SingleReportData> {
        self.data.single()
    }

    pub fn combined(&self) -> Option<&CombinedReportData> {
        match &self.data {
            ReportData::Combined(data) => Some(data),
            _ => None,
        }
    }

    pub fn combined_mut(&mut self) -> Option<&mut CombinedReportData> {
        match &mut self.data {
            ReportData::Combined(data) => Some(data),
            _ => None,
        }
    }
}

/// Variant payload of a report, discriminated by `reportType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reportType", rename_all = "camelCase")]
pub enum ReportData {
    SingleProcess(SingleReportData),
    SingleDecision(SingleReportData),
    Combined(CombinedReportData),
}

impl ReportData {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportData::SingleProcess(_) => ReportKind::SingleProcess,
            ReportData::SingleDecision(_) => ReportKind::SingleDecision,
            ReportData::Combined(_) => ReportKind::Combined,
        }
    }

    pub fn single(&self) -> Option<&SingleReportData> {
        match self {
            ReportData::SingleProcess(data) | ReportData::SingleDecision(data) => Some(data),
            ReportData::Combined(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    SingleProcess,
    SingleDecision,
    Combined,
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReportKind::SingleProcess => "single process report",
            ReportKind::SingleDecision => "single decision report",
            ReportKind::Combined => "combined report",
        };
        f.write_str(name)
    }
}

/// Payload of a single (process or decision) report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleReportData {
    pub definition: DefinitionRef,
    pub view: ReportView,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub distributed_by: DistributedBy,
    pub visualization: Visualization,
    #[serde(default)]
    pub filters: Vec<ReportFilter>,
    #[serde(default)]
    pub configuration: ReportConfiguration,
}

impl SingleReportData {
    pub fn new(
        definition_key: impl Into<String>,
        view: ReportView,
        group_by: GroupBy,
        visualization: Visualization,
    ) -> Self {
        Self {
            definition: DefinitionRef::new(definition_key),
            view,
            group_by,
            distributed_by: DistributedBy::None,
            visualization,
            filters: Vec::new(),
            configuration: ReportConfiguration::default(),
        }
    }

    pub fn with_filter(mut self, filter: ReportFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_distributed_by(mut self, distributed_by: DistributedBy) -> Self {
        self.distributed_by = distributed_by;
        self
    }

    pub fn with_custom_bucket(mut self, bucket: CustomBucket) -> Self {
        self.configuration.custom_bucket = bucket;
        self
    }

    /// Date unit of the grouping, if the report groups by a date.
    pub fn date_unit(&self) -> Option<DateUnit> {
        match &self.group_by {
            GroupBy::StartDate { unit }
            | GroupBy::EndDate { unit }
            | GroupBy::RunningDate { unit }
            | GroupBy::EvaluationDate { unit } => Some(*unit),
            GroupBy::Variable { variable_type, .. } if *variable_type == VariableType::Date => {
                Some(self.configuration.group_by_date_variable_unit)
            }
            _ => None,
        }
    }

    pub fn is_raw_data(&self) -> bool {
        self.view.property == ViewProperty::RawData
    }

    pub fn is_hyper_map(&self) -> bool {
        self.distributed_by != DistributedBy::None
    }

    /// Reports producing a single number can carry alerts.
    pub fn is_number_report(&self) -> bool {
        self.group_by == GroupBy::None && self.visualization == Visualization::Number
    }
}

/// The process or decision definition a single report reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionRef {
    pub key: String,
    /// Version selectors: explicit versions, `"all"` or `"latest"`.
    #[serde(default = "all_versions")]
    pub versions: Vec<String>,
    /// Empty means every tenant.
    #[serde(default)]
    pub tenant_ids: Vec<String>,
}

fn all_versions() -> Vec<String> {
    vec![ALL_VERSIONS.to_string()]
}

pub const ALL_VERSIONS: &str = "all";
pub const LATEST_VERSION: &str = "latest";

impl DefinitionRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            versions: all_versions(),
            tenant_ids: Vec::new(),
        }
    }

    /// Whether `version` is selected, given the latest known version.
    pub fn selects_version(&self, version: &str, latest: Option<&str>) -> bool {
        self.versions.iter().any(|selector| {
            selector.eq_ignore_ascii_case(ALL_VERSIONS)
                || selector == version
                || (selector.eq_ignore_ascii_case(LATEST_VERSION) && latest == Some(version))
        })
    }

    pub fn selects_tenant(&self, tenant: Option<&str>) -> bool {
        self.tenant_ids.is_empty()
            || tenant.is_some_and(|t| self.tenant_ids.iter().any(|id| id == t))
    }
}

/// What a report measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub entity: ViewEntity,
    pub property: ViewProperty,
}

impl ReportView {
    pub fn new(entity: ViewEntity, property: ViewProperty) -> Self {
        Self { entity, property }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewEntity {
    ProcessInstance,
    FlowNode,
    UserTask,
    Variable,
    DecisionInstance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewProperty {
    Frequency,
    Duration,
    RawData,
    Percentage,
}

/// First-level grouping of a report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GroupBy {
    #[default]
    None,
    StartDate {
        unit: DateUnit,
    },
    EndDate {
        unit: DateUnit,
    },
    RunningDate {
        unit: DateUnit,
    },
    Duration,
    Variable {
        name: String,
        variable_type: VariableType,
    },
    FlowNodes,
    UserTasks,
    Assignee,
    CandidateGroup,
    EvaluationDate {
        unit: DateUnit,
    },
    InputVariable {
        id: String,
    },
    OutputVariable {
        id: String,
    },
}

/// Second-level grouping. Anything other than `None` makes a hyper-map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DistributedBy {
    #[default]
    None,
    FlowNode,
    UserTask,
    Assignee,
    CandidateGroup,
    Variable { name: String },
    StartDate { unit: DateUnit },
    EndDate { unit: DateUnit },
}

/// Bucket width of a date grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateUnit {
    #[default]
    Automatic,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl DateUnit {
    /// Fixed calendar units, finest first.
    pub const FIXED: [DateUnit; 7] = [
        DateUnit::Minute,
        DateUnit::Hour,
        DateUnit::Day,
        DateUnit::Week,
        DateUnit::Month,
        DateUnit::Quarter,
        DateUnit::Year,
    ];

    /// Parse a unit from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "automatic" => Some(DateUnit::Automatic),
            "minute" => Some(DateUnit::Minute),
            "hour" => Some(DateUnit::Hour),
            "day" => Some(DateUnit::Day),
            "week" => Some(DateUnit::Week),
            "month" => Some(DateUnit::Month),
            "quarter" => Some(DateUnit::Quarter),
            "year" => Some(DateUnit::Year),
            _ => None,
        }
    }
}

impl std::fmt::Display for DateUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DateUnit::Automatic => "automatic",
            DateUnit::Minute => "minute",
            DateUnit::Hour => "hour",
            DateUnit::Day => "day",
            DateUnit::Week => "week",
            DateUnit::Month => "month",
            DateUnit::Quarter => "quarter",
            DateUnit::Year => "year",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Boolean,
    Short,
    Integer,
    Long,
    Double,
    Date,
}

impl VariableType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            VariableType::Short | VariableType::Integer | VariableType::Long | VariableType::Double
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visualization {
    Number,
    Table,
    Bar,
    Line,
    Pie,
    Heat,
}

/// Per-report display and evaluation configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportConfiguration {
    /// Which user task duration is measured; free to differ between combined members.
    pub user_task_duration_time: UserTaskDurationTime,
    pub aggregation_type: AggregationType,
    pub custom_bucket: CustomBucket,
    pub group_by_date_variable_unit: DateUnit,
    pub color: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserTaskDurationTime {
    #[default]
    Total,
    Idle,
    Work,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationType {
    #[default]
    Avg,
    Min,
    Max,
    Median,
    Sum,
}

/// User-defined bucketing for numeric groupings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomBucket {
    pub active: bool,
    pub bucket_size: Option<f64>,
    pub baseline: Option<f64>,
}

impl CustomBucket {
    pub fn sized(bucket_size: f64, baseline: Option<f64>) -> Self {
        Self {
            active: true,
            bucket_size: Some(bucket_size),
            baseline,
        }
    }

    /// The settings that take effect; an inactive bucket has none.
    pub fn effective(&self) -> Option<(Option<f64>, Option<f64>)> {
        self.active.then_some((self.bucket_size, self.baseline))
    }
}

/// Payload of a combined report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedReportData {
    #[serde(default)]
    pub reports: Vec<CombinedReportItem>,
    #[serde(default)]
    pub configuration: CombinedReportConfiguration,
}

impl CombinedReportData {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reports: ids
                .into_iter()
                .map(|id| CombinedReportItem {
                    id: id.into(),
                    color: None,
                })
                .collect(),
            configuration: CombinedReportConfiguration::default(),
        }
    }

    /// Member ids in first-occurrence order, duplicates dropped.
    pub fn member_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.reports
            .iter()
            .map(|item| item.id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn contains(&self, report_id: &str) -> bool {
        self.reports.iter().any(|item| item.id == report_id)
    }

    /// Remove every occurrence of a member. Returns true if one was removed.
    pub fn remove_member(&mut self, report_id: &str) -> bool {
        let before = self.reports.len();
        self.reports.retain(|item| item.id != report_id);
        self.reports.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedReportItem {
    pub id: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CombinedReportConfiguration {
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub hide_absolute_value: bool,
    pub hide_relative_value: bool,
}
