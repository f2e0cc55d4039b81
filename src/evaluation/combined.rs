//! Combined report evaluation.
//!
//! Evaluates each member as an ordinary single report, with the additional
//! filters routed per member, then aligns the results on one axis:
//!
//! 1. Drop duplicate members (first position wins) and members that are no
//!    longer single process reports of the group's shape
//! 2. Route each additional filter to the members whose schema understands it
//! 3. Evaluate every member; a member that fails is excluded, not fatal
//! 4. Reconcile the bucketed results onto a shared axis
//! 5. Count distinct instances across all surviving members

use std::collections::{BTreeSet, HashSet};

use tracing::{info, warn};

use crate::evaluation::{route_filters, SingleReportEvaluator};
use crate::model::{
    CombinedResult, ExcludedMember, FilterOutcome, MemberResult, ReportDefinition, ReportFilter,
    ReportKind, ResultData, SingleReportData,
};
use crate::reconcile::{AxisStrategy, DEFAULT_BUCKET_LIMIT};
use crate::validation::ReportShape;

/// A member that made it through evaluation.
struct Evaluated {
    report: ReportDefinition,
    data: ResultData,
    instance_ids: BTreeSet<String>,
    filters: FilterOutcome,
}

/// Evaluates combined reports through a single-report evaluator.
pub struct CombinedEvaluator<'a, E: SingleReportEvaluator + ?Sized> {
    evaluator: &'a E,
    bucket_limit: usize,
}

impl<'a, E: SingleReportEvaluator + ?Sized> CombinedEvaluator<'a, E> {
    pub fn new(evaluator: &'a E) -> Self {
        Self {
            evaluator,
            bucket_limit: DEFAULT_BUCKET_LIMIT,
        }
    }

    pub fn with_bucket_limit(mut self, bucket_limit: usize) -> Self {
        self.bucket_limit = bucket_limit;
        self
    }

    /// Evaluate resolved members under `additional` filters.
    ///
    /// Never fails: members that cannot be evaluated are listed in
    /// [`CombinedResult::excluded`] and the rest are still returned.
    pub fn evaluate(&self, members: &[ReportDefinition], additional: &[ReportFilter]) -> CombinedResult {
        let mut excluded = Vec::new();
        let mut evaluated: Vec<Evaluated> = Vec::new();
        let mut shape: Option<ReportShape> = None;
        let mut seen = HashSet::new();

        for report in members {
            if !seen.insert(report.id.as_str()) {
                continue;
            }

            let Some(data) = report.single().filter(|_| report.kind() == ReportKind::SingleProcess)
            else {
                exclude(&mut excluded, report, format!("member is a {}", report.kind()));
                continue;
            };

            match (ReportShape::of(data), &shape) {
                (Err(reason), _) => {
                    exclude(&mut excluded, report, format!("member {}", reason));
                    continue;
                }
                (Ok(own), Some(expected)) => {
                    if let Some(component) = expected.mismatch(&own) {
                        exclude(
                            &mut excluded,
                            report,
                            format!("member no longer matches the group's {}", component),
                        );
                        continue;
                    }
                }
                (Ok(own), None) => shape = Some(own),
            }

            let (effective, outcome) = route_filters(self.evaluator, report, data, additional);

            match self.evaluator.evaluate(report, &effective) {
                Ok(result) => {
                    if matches!(result.data, ResultData::Raw(_)) {
                        exclude(
                            &mut excluded,
                            report,
                            "raw data results cannot be combined".to_string(),
                        );
                        continue;
                    }
                    // no instances means no data, not zero counts
                    let data = if result.instance_ids.is_empty() {
                        result.data.without_values()
                    } else {
                        result.data
                    };
                    evaluated.push(Evaluated {
                        report: report.clone(),
                        data,
                        instance_ids: result.instance_ids,
                        filters: outcome,
                    });
                }
                Err(e) => exclude(&mut excluded, report, e.to_string()),
            }
        }

        let result = self.assemble(evaluated, excluded);
        info!(
            members = result.members.len(),
            excluded = result.excluded.len(),
            instance_count = result.instance_count,
            "evaluated combined report"
        );
        result
    }

    fn assemble(&self, evaluated: Vec<Evaluated>, excluded: Vec<ExcludedMember>) -> CombinedResult {
        let instance_ids: BTreeSet<&str> = evaluated
            .iter()
            .flat_map(|m| m.instance_ids.iter().map(String::as_str))
            .collect();
        let instance_count = instance_ids.len() as u64;

        let singles: Vec<&SingleReportData> =
            evaluated.iter().filter_map(|m| m.report.single()).collect();
        let strategy = AxisStrategy::for_members(&singles, self.bucket_limit);

        let maps: Vec<_> = evaluated
            .iter()
            .filter_map(|m| m.data.as_map().cloned())
            .collect();
        let reconciled = strategy.reconcile(&maps);
        let is_complete =
            reconciled.is_complete && reconciled.results.iter().all(|r| r.is_complete);
        let mut aligned = reconciled.results.into_iter();

        let members = evaluated
            .into_iter()
            .map(|member| {
                let data = match member.data {
                    ResultData::Map(original) => {
                        ResultData::Map(aligned.next().unwrap_or(original))
                    }
                    other => other,
                };
                MemberResult {
                    instance_count: member.instance_ids.len() as u64,
                    report: member.report,
                    data,
                    filters: member.filters,
                }
            })
            .collect();

        CombinedResult {
            members,
            instance_count,
            excluded,
            is_complete,
        }
    }
}

fn exclude(excluded: &mut Vec<ExcludedMember>, report: &ReportDefinition, reason: String) {
    warn!(report_id = %report.id, %reason, "excluding member from combined evaluation");
    excluded.push(ExcludedMember {
        report_id: report.id.clone(),
        reason,
    });
}
