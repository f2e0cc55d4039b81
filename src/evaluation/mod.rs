//! Report evaluation.
//!
//! Single reports are evaluated by a [`SingleReportEvaluator`], the
//! collaborator that owns the data. The [`CombinedEvaluator`] drives it for
//! every member of a combined report, routes additional filters to the
//! members that understand them and aligns the results on one axis.

mod combined;
mod in_memory;

pub use combined::CombinedEvaluator;
pub use in_memory::{
    FlowNodeInstance, InMemoryEvaluator, InstanceState, ProcessDataSet, ProcessDefinitionSchema,
    ProcessInstance,
};

use tracing::debug;

use crate::model::{
    FilterOutcome, ReportDefinition, ReportFilter, SingleReportData, SingleReportResult,
    SkippedFilter,
};

/// Errors raised while evaluating a single report.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Definition '{key}' is not available")]
    DefinitionUnavailable { key: String },

    #[error("Unsupported report: {0}")]
    Unsupported(String),

    #[error("Data source error: {0}")]
    DataSource(String),
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;

/// Whether a filter can be applied to a report's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterApplicability {
    Applicable,
    NotApplicable(String),
}

impl FilterApplicability {
    pub fn is_applicable(&self) -> bool {
        matches!(self, FilterApplicability::Applicable)
    }
}

/// Evaluates single reports against the underlying data.
pub trait SingleReportEvaluator {
    /// Evaluate `report` with `filters` in place of its stored filters.
    fn evaluate(
        &self,
        report: &ReportDefinition,
        filters: &[ReportFilter],
    ) -> EvaluationResult<SingleReportResult>;

    /// Whether `filter` means anything for `report`.
    ///
    /// Additional filters that are not applicable are skipped for that
    /// report only.
    fn applicability(&self, report: &ReportDefinition, filter: &ReportFilter) -> FilterApplicability {
        let _ = (report, filter);
        FilterApplicability::Applicable
    }
}

impl<E: SingleReportEvaluator + ?Sized> SingleReportEvaluator for &E {
    fn evaluate(
        &self,
        report: &ReportDefinition,
        filters: &[ReportFilter],
    ) -> EvaluationResult<SingleReportResult> {
        (**self).evaluate(report, filters)
    }

    fn applicability(&self, report: &ReportDefinition, filter: &ReportFilter) -> FilterApplicability {
        (**self).applicability(report, filter)
    }
}

/// Split additional filters into the ones a report applies and the ones it skips.
///
/// The report's own stored filters always apply and come first.
pub(crate) fn route_filters<E: SingleReportEvaluator + ?Sized>(
    evaluator: &E,
    report: &ReportDefinition,
    data: &SingleReportData,
    additional: &[ReportFilter],
) -> (Vec<ReportFilter>, FilterOutcome) {
    let mut effective = data.filters.clone();
    let mut outcome = FilterOutcome::default();

    for filter in additional {
        match evaluator.applicability(report, filter) {
            FilterApplicability::Applicable => {
                effective.push(filter.clone());
                outcome.applied.push(filter.clone());
            }
            FilterApplicability::NotApplicable(reason) => {
                debug!(
                    report_id = %report.id,
                    filter = %filter.label(),
                    %reason,
                    "skipping additional filter"
                );
                outcome.skipped.push(SkippedFilter {
                    filter: filter.clone(),
                    reason,
                });
            }
        }
    }

    (effective, outcome)
}
