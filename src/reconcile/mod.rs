//! Bucket axis reconciliation.
//!
//! Members of a combined report are evaluated independently, so their
//! bucket keys rarely line up. Reconciliation computes one ordered key
//! sequence covering every member and re-keys each member onto it, padding
//! with `None` where a member has no data.
//!
//! The merge math depends on the grouping, so there is one strategy per
//! axis kind:
//!
//! - [`DateAxis`]: calendar buckets from the earliest to the latest bucket
//!   start, at the finest unit any member uses.
//! - [`NumericAxis`]: fixed-width buckets from the power-of-ten floor of the
//!   global minimum up to the global maximum.
//! - [`CategoricalAxis`]: union of keys in first-seen order.

mod categorical;
mod date;
mod numeric;

pub use categorical::CategoricalAxis;
pub use date::{DateAxis, DATE_KEY_FORMAT};
pub use numeric::NumericAxis;

pub(crate) use date::{advance_date, format_date_key, truncate_date};
pub(crate) use numeric::floor_power_of_ten;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{BucketedResult, DateUnit, GroupBy, MapEntry, SingleReportData, VariableType};

/// Default cap on the number of keys a shared axis may hold.
pub const DEFAULT_BUCKET_LIMIT: usize = 1000;

/// Members re-keyed onto one shared axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledAxis {
    /// One result per input, in input order, all with the same key sequence.
    pub results: Vec<BucketedResult>,
    /// False when the axis was cut at the bucket limit.
    pub is_complete: bool,
}

impl ReconciledAxis {
    /// Key sequence of the shared axis.
    pub fn keys(&self) -> Vec<&str> {
        self.results.first().map(|r| r.keys()).unwrap_or_default()
    }

    /// Every member empty: there is no axis to compute.
    pub(crate) fn empty(results: &[BucketedResult]) -> Self {
        Self {
            results: results
                .iter()
                .map(|r| BucketedResult {
                    entries: Vec::new(),
                    is_complete: r.is_complete,
                })
                .collect(),
            is_complete: true,
        }
    }
}

/// Kind of axis a grouping produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisKind {
    Date,
    Numeric,
    Categorical,
}

impl AxisKind {
    pub fn of(group_by: &GroupBy) -> Self {
        match group_by {
            GroupBy::StartDate { .. }
            | GroupBy::EndDate { .. }
            | GroupBy::RunningDate { .. }
            | GroupBy::EvaluationDate { .. } => AxisKind::Date,
            GroupBy::Variable { variable_type, .. } if *variable_type == VariableType::Date => {
                AxisKind::Date
            }
            GroupBy::Variable { variable_type, .. } if variable_type.is_numeric() => {
                AxisKind::Numeric
            }
            GroupBy::Duration => AxisKind::Numeric,
            _ => AxisKind::Categorical,
        }
    }
}

impl std::fmt::Display for AxisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AxisKind::Date => "date",
            AxisKind::Numeric => "numeric",
            AxisKind::Categorical => "categorical",
        };
        f.write_str(s)
    }
}

/// Reconciliation strategy, selected by the grouping of the members.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisStrategy {
    Date(DateAxis),
    Numeric(NumericAxis),
    Categorical(CategoricalAxis),
}

impl AxisStrategy {
    /// Plain strategy for an axis kind, with no unit or bucket hints.
    pub fn for_kind(kind: AxisKind, bucket_limit: usize) -> Self {
        match kind {
            AxisKind::Date => AxisStrategy::Date(DateAxis::new(bucket_limit)),
            AxisKind::Numeric => AxisStrategy::Numeric(NumericAxis::new(bucket_limit)),
            AxisKind::Categorical => AxisStrategy::Categorical(CategoricalAxis::new(bucket_limit)),
        }
    }

    /// Strategy for a set of combinable members.
    ///
    /// Date axes use the finest fixed unit when every member has one, and
    /// infer the unit from the keys as soon as one member is automatic.
    /// Numeric variable axes honour the shared custom bucket.
    pub fn for_members(members: &[&SingleReportData], bucket_limit: usize) -> Self {
        let Some(first) = members.first() else {
            return AxisStrategy::Categorical(CategoricalAxis::new(bucket_limit));
        };

        match AxisKind::of(&first.group_by) {
            AxisKind::Date => {
                let units: Vec<_> = members.iter().filter_map(|m| m.date_unit()).collect();
                let fixed = units.iter().all(|u| *u != DateUnit::Automatic);
                let unit = if fixed { units.into_iter().min() } else { None };
                AxisStrategy::Date(DateAxis::new(bucket_limit).with_unit(unit))
            }
            AxisKind::Numeric => {
                let axis = NumericAxis::new(bucket_limit);
                match first.group_by {
                    GroupBy::Variable { .. } => AxisStrategy::Numeric(
                        axis.with_custom_bucket(first.configuration.custom_bucket),
                    ),
                    _ => AxisStrategy::Numeric(axis),
                }
            }
            AxisKind::Categorical => AxisStrategy::Categorical(CategoricalAxis::new(bucket_limit)),
        }
    }

    pub fn kind(&self) -> AxisKind {
        match self {
            AxisStrategy::Date(_) => AxisKind::Date,
            AxisStrategy::Numeric(_) => AxisKind::Numeric,
            AxisStrategy::Categorical(_) => AxisKind::Categorical,
        }
    }

    /// Re-key every result onto one shared axis.
    pub fn reconcile(&self, results: &[BucketedResult]) -> ReconciledAxis {
        let axis = match self {
            AxisStrategy::Date(axis) => axis.reconcile(results),
            AxisStrategy::Numeric(axis) => axis.reconcile(results),
            AxisStrategy::Categorical(axis) => axis.reconcile(results),
        };
        debug!(
            strategy = %self.kind(),
            members = results.len(),
            keys = axis.keys().len(),
            "reconciled bucket axis"
        );
        axis
    }
}

/// Build the re-keyed results from the axis keys and each member's
/// `(slot, value)` placements.
///
/// Two keys of one member landing in the same slot keep the first non-null
/// value. Placements beyond the axis are dropped.
pub(crate) fn assemble(
    results: &[BucketedResult],
    keys: Vec<String>,
    placements: Vec<Vec<(usize, Option<f64>)>>,
    truncated: bool,
) -> ReconciledAxis {
    if truncated {
        warn!(keys = keys.len(), "bucket axis truncated at the bucket limit");
    }

    let reconciled = results
        .iter()
        .zip(placements)
        .map(|(result, placed)| {
            let mut values: Vec<Option<f64>> = vec![None; keys.len()];
            for (slot, value) in placed {
                if let Some(current) = values.get_mut(slot) {
                    if current.is_none() {
                        *current = value;
                    }
                }
            }
            BucketedResult {
                entries: keys
                    .iter()
                    .zip(values)
                    .map(|(key, value)| MapEntry::new(key.clone(), value))
                    .collect(),
                is_complete: result.is_complete && !truncated,
            }
        })
        .collect();

    ReconciledAxis {
        results: reconciled,
        is_complete: !truncated,
    }
}
