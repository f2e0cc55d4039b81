//! Combinability of single reports.
//!
//! Two single reports can be shown as one combined report when their
//! shapes agree: same view, same kind of grouping, same visualization and,
//! for numeric variable groupings, the same custom bucket configuration.
//! Raw-data and hyper-map reports never combine, and neither do decision
//! reports or combined reports themselves.

use crate::model::{
    CombinedReportData, GroupBy, ReportDefinition, ReportKind, ReportView, SingleReportData,
    VariableType, Visualization,
};

/// Validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A member cannot be grouped with the others.
    NotCombinable {
        report_id: String,
        reason: NotCombinableReason,
    },
    /// A combined report references a report that does not exist.
    UnknownMember { report_id: String },
    /// A member lives in a different collection than the combined report.
    CollectionMismatch {
        report_id: String,
        expected: Option<String>,
        found: Option<String>,
    },
    /// Alerts only target single process number reports.
    NotAlertable { report_id: String },
    /// An update tried to turn a report into another kind.
    KindChange {
        report_id: String,
        from: ReportKind,
        to: ReportKind,
    },
}

/// Why a member failed the combinability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotCombinableReason {
    CombinedMember,
    DecisionReport,
    RawData,
    HyperMap,
    Mismatch(ShapeComponent),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NotCombinable { report_id, reason } => {
                write!(f, "Reports not combinable: report '{}' {}", report_id, reason)
            }
            ValidationError::UnknownMember { report_id } => {
                write!(f, "Combined report references unknown report '{}'", report_id)
            }
            ValidationError::CollectionMismatch {
                report_id,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Report '{}' is in {} but the combined report is in {}",
                    report_id,
                    describe_collection(found.as_deref()),
                    describe_collection(expected.as_deref())
                )
            }
            ValidationError::NotAlertable { report_id } => {
                write!(
                    f,
                    "Report '{}' does not produce a single number and cannot carry alerts",
                    report_id
                )
            }
            ValidationError::KindChange {
                report_id,
                from,
                to,
            } => {
                write!(f, "Report '{}' cannot change from {} to {}", report_id, from, to)
            }
        }
    }
}

fn describe_collection(id: Option<&str>) -> String {
    match id {
        Some(id) => format!("collection '{}'", id),
        None => "private space".to_string(),
    }
}

impl std::error::Error for ValidationError {}

impl std::fmt::Display for NotCombinableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotCombinableReason::CombinedMember => {
                write!(f, "is a combined report and cannot be nested")
            }
            NotCombinableReason::DecisionReport => write!(f, "is a decision report"),
            NotCombinableReason::RawData => write!(f, "shows raw data"),
            NotCombinableReason::HyperMap => write!(f, "has a second grouping level"),
            NotCombinableReason::Mismatch(component) => {
                write!(f, "differs from the first report in its {}", component)
            }
        }
    }
}

/// Grouping class shared by combinable reports.
///
/// Start, end and running date groupings all bucket by date and combine
/// with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupByShape {
    None,
    Date,
    Duration,
    NumericVariable,
    DateVariable,
    CategoricalVariable,
    FlowNodes,
    UserTasks,
    Assignee,
    CandidateGroup,
    DecisionVariable,
}

impl GroupByShape {
    pub fn of(group_by: &GroupBy) -> Self {
        match group_by {
            GroupBy::None => GroupByShape::None,
            GroupBy::StartDate { .. }
            | GroupBy::EndDate { .. }
            | GroupBy::RunningDate { .. }
            | GroupBy::EvaluationDate { .. } => GroupByShape::Date,
            GroupBy::Duration => GroupByShape::Duration,
            GroupBy::Variable { variable_type, .. } => {
                if variable_type.is_numeric() {
                    GroupByShape::NumericVariable
                } else if *variable_type == VariableType::Date {
                    GroupByShape::DateVariable
                } else {
                    GroupByShape::CategoricalVariable
                }
            }
            GroupBy::FlowNodes => GroupByShape::FlowNodes,
            GroupBy::UserTasks => GroupByShape::UserTasks,
            GroupBy::Assignee => GroupByShape::Assignee,
            GroupBy::CandidateGroup => GroupByShape::CandidateGroup,
            GroupBy::InputVariable { .. } | GroupBy::OutputVariable { .. } => {
                GroupByShape::DecisionVariable
            }
        }
    }
}

/// The part of a shape two reports disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeComponent {
    Visualization,
    View,
    GroupBy,
    BucketConfiguration,
}

impl std::fmt::Display for ShapeComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ShapeComponent::Visualization => "visualization",
            ShapeComponent::View => "view",
            ShapeComponent::GroupBy => "grouping",
            ShapeComponent::BucketConfiguration => "bucket configuration",
        };
        f.write_str(s)
    }
}

/// The combinability key of a single report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportShape {
    pub view: ReportView,
    pub group_by: GroupByShape,
    pub visualization: Visualization,
    /// Effective custom bucket `(size, baseline)`; only set for numeric variables.
    pub bucket: Option<(Option<f64>, Option<f64>)>,
}

impl ReportShape {
    /// Shape of a report, or the reason it never combines.
    pub fn of(data: &SingleReportData) -> Result<Self, NotCombinableReason> {
        if data.is_raw_data() {
            return Err(NotCombinableReason::RawData);
        }
        if data.is_hyper_map() {
            return Err(NotCombinableReason::HyperMap);
        }

        let group_by = GroupByShape::of(&data.group_by);
        let bucket = match group_by {
            GroupByShape::NumericVariable => data.configuration.custom_bucket.effective(),
            _ => None,
        };

        Ok(Self {
            view: data.view,
            group_by,
            visualization: data.visualization,
            bucket,
        })
    }

    /// First component in which `other` differs, if any.
    pub fn mismatch(&self, other: &ReportShape) -> Option<ShapeComponent> {
        if self.visualization != other.visualization {
            Some(ShapeComponent::Visualization)
        } else if self.view != other.view {
            Some(ShapeComponent::View)
        } else if self.group_by != other.group_by {
            Some(ShapeComponent::GroupBy)
        } else if self.bucket != other.bucket {
            Some(ShapeComponent::BucketConfiguration)
        } else {
            None
        }
    }
}

/// Whether the given single reports can be grouped into one combined report.
pub fn can_combine(reports: &[&SingleReportData]) -> bool {
    first_incompatibility(reports).is_none()
}

/// Index and reason of the first report that breaks the group.
fn first_incompatibility(reports: &[&SingleReportData]) -> Option<(usize, NotCombinableReason)> {
    let mut first: Option<ReportShape> = None;

    for (index, data) in reports.iter().enumerate() {
        let shape = match ReportShape::of(data) {
            Ok(shape) => shape,
            Err(reason) => return Some((index, reason)),
        };
        match &first {
            None => first = Some(shape),
            Some(expected) => {
                if let Some(component) = expected.mismatch(&shape) {
                    return Some((index, NotCombinableReason::Mismatch(component)));
                }
            }
        }
    }

    None
}

/// Check resolved member definitions for combinability.
pub fn check_combinable(reports: &[&ReportDefinition]) -> Result<(), ValidationError> {
    let mut singles = Vec::with_capacity(reports.len());
    for report in reports {
        let reason = match report.kind() {
            ReportKind::SingleProcess => None,
            ReportKind::SingleDecision => Some(NotCombinableReason::DecisionReport),
            ReportKind::Combined => Some(NotCombinableReason::CombinedMember),
        };
        if let Some(reason) = reason {
            return Err(ValidationError::NotCombinable {
                report_id: report.id.clone(),
                reason,
            });
        }
        if let Some(data) = report.single() {
            singles.push(data);
        }
    }

    match first_incompatibility(&singles) {
        Some((index, reason)) => Err(ValidationError::NotCombinable {
            report_id: reports[index].id.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Resolve and validate the members of a combined report payload.
///
/// Every member must exist, be a single process report, live in the same
/// collection as the combined report and share one shape with the others.
/// Returns the resolved members in first-occurrence order.
pub fn validate_combined_members<F>(
    data: &CombinedReportData,
    collection_id: Option<&str>,
    resolve: F,
) -> Result<Vec<ReportDefinition>, ValidationError>
where
    F: Fn(&str) -> Option<ReportDefinition>,
{
    let mut members = Vec::new();
    for id in data.member_ids() {
        let report = resolve(id).ok_or_else(|| ValidationError::UnknownMember {
            report_id: id.to_string(),
        })?;
        if report.collection_id.as_deref() != collection_id {
            return Err(ValidationError::CollectionMismatch {
                report_id: id.to_string(),
                expected: collection_id.map(str::to_string),
                found: report.collection_id.clone(),
            });
        }
        members.push(report);
    }

    let refs: Vec<&ReportDefinition> = members.iter().collect();
    check_combinable(&refs)?;
    Ok(members)
}

/// Alerts need a single process report producing one number.
pub fn validate_alert_target(report: &ReportDefinition) -> Result<(), ValidationError> {
    match (&report.kind(), report.single()) {
        (ReportKind::SingleProcess, Some(data)) if data.is_number_report() => Ok(()),
        _ => Err(ValidationError::NotAlertable {
            report_id: report.id.clone(),
        }),
    }
}
