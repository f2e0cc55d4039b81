//! Report operations over a definition store and an evaluator.
//!
//! [`ReportService`] is the write and evaluation entry point. Writes are
//! validated first; updates and deletes are planned against a snapshot of
//! the store (see [`conflicts`]) and either rejected with the full set of
//! dependents or, when forced, committed together with their cascade in one
//! atomic batch.

pub mod conflicts;

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EvaluationSettings;
use crate::error::{ServiceError, ServiceResult};
use crate::evaluation::{route_filters, CombinedEvaluator, SingleReportEvaluator};
use crate::model::{
    Alert, Collection, CombinedReportData, CombinedResult, ConflictSet, Dashboard,
    ExcludedMember, FilterOutcome, ReportData, ReportDefinition, ReportFilter, SingleReportResult,
};
use crate::store::{DefinitionStore, EntityKind, Expected, StoreExt, WriteBatch};
use crate::validation::{
    validate_alert_target, validate_combined_members, NotCombinableReason, ValidationError,
};

pub use conflicts::{apply_with_cascade, compute_dependents, Change, Snapshot};

/// A report to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub name: String,
    pub owner: Option<String>,
    pub collection_id: Option<String>,
    pub data: ReportData,
}

impl NewReport {
    pub fn new(name: impl Into<String>, data: ReportData) -> Self {
        Self {
            name: name.into(),
            owner: None,
            collection_id: None,
            data,
        }
    }

    pub fn in_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }
}

/// Result of evaluating a stored report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EvaluatedReport {
    Single {
        report: ReportDefinition,
        result: SingleReportResult,
        filters: FilterOutcome,
    },
    Combined {
        report: ReportDefinition,
        result: CombinedResult,
    },
}

impl EvaluatedReport {
    pub fn report(&self) -> &ReportDefinition {
        match self {
            EvaluatedReport::Single { report, .. } | EvaluatedReport::Combined { report, .. } => {
                report
            }
        }
    }

    pub fn combined(&self) -> Option<&CombinedResult> {
        match self {
            EvaluatedReport::Combined { result, .. } => Some(result),
            EvaluatedReport::Single { .. } => None,
        }
    }
}

/// Report, dashboard, alert and collection operations.
pub struct ReportService<S, E> {
    store: S,
    evaluator: E,
    settings: EvaluationSettings,
}

impl<S: DefinitionStore, E: SingleReportEvaluator> ReportService<S, E> {
    pub fn new(store: S, evaluator: E) -> Self {
        Self {
            store,
            evaluator,
            settings: EvaluationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EvaluationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    // ---------------------------------------------------------------------
    // Reports
    // ---------------------------------------------------------------------

    pub fn get_report(&self, id: &str) -> ServiceResult<ReportDefinition> {
        self.store
            .get::<ReportDefinition>(id)?
            .map(|stored| stored.value)
            .ok_or_else(|| ServiceError::not_found(EntityKind::Report, id))
    }

    pub fn list_reports(&self) -> ServiceResult<Vec<ReportDefinition>> {
        Ok(self
            .store
            .list::<ReportDefinition>()?
            .into_iter()
            .map(|stored| stored.value)
            .collect())
    }

    /// Store a new report. Combined reports are validated against their
    /// stored members and nothing is written when validation fails.
    pub fn create_report(&self, new: NewReport) -> ServiceResult<ReportDefinition> {
        if let Some(collection_id) = &new.collection_id {
            self.require_collection(collection_id)?;
        }
        if let ReportData::Combined(data) = &new.data {
            self.resolve_members(data, new.collection_id.as_deref())?;
        }

        let report = ReportDefinition {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            owner: new.owner,
            collection_id: new.collection_id,
            last_modified: Some(Utc::now()),
            data: new.data,
        };

        let mut batch = WriteBatch::new();
        batch.put(&report, Expected::Absent)?;
        self.store.commit(batch)?;

        info!(report_id = %report.id, kind = %report.kind(), "created report");
        Ok(report)
    }

    /// Dependents an update of report `id` to `data` would break.
    pub fn update_conflicts(&self, id: &str, data: &ReportData) -> ServiceResult<ConflictSet> {
        let snapshot = Snapshot::load(&self.store)?;
        let after = self.updated_definition(&snapshot, id, data.clone())?;
        Ok(compute_dependents(&snapshot, &Change::UpdateReport(after)))
    }

    /// Replace the data of report `id`.
    ///
    /// Without `force`, an update that breaks combined reports or alerts is
    /// rejected with [`ServiceError::Conflict`]. With `force`, the report is
    /// removed from the combined reports it no longer fits and its alerts
    /// are deleted in the same batch.
    pub fn update_report(
        &self,
        id: &str,
        data: ReportData,
        force: bool,
    ) -> ServiceResult<ReportDefinition> {
        let snapshot = Snapshot::load(&self.store)?;
        let after = self.updated_definition(&snapshot, id, data)?;
        let change = Change::UpdateReport(after.clone());

        self.commit_change(&snapshot, &change, force)?;
        info!(report_id = %id, force, "updated report");
        Ok(after)
    }

    /// Dependents a deletion of report `id` would orphan.
    pub fn delete_conflicts(&self, id: &str) -> ServiceResult<ConflictSet> {
        let snapshot = Snapshot::load(&self.store)?;
        if snapshot.report(id).is_none() {
            return Err(ServiceError::not_found(EntityKind::Report, id));
        }
        Ok(compute_dependents(&snapshot, &Change::DeleteReport(id.to_string())))
    }

    /// Delete report `id`.
    ///
    /// Without `force`, fails with the combined reports, dashboards and
    /// alerts that still reference it. With `force`, it is removed from each
    /// of them (alerts are deleted) atomically with the report itself.
    pub fn delete_report(&self, id: &str, force: bool) -> ServiceResult<()> {
        let snapshot = Snapshot::load(&self.store)?;
        if snapshot.report(id).is_none() {
            return Err(ServiceError::not_found(EntityKind::Report, id));
        }

        self.commit_change(&snapshot, &Change::DeleteReport(id.to_string()), force)?;
        info!(report_id = %id, force, "deleted report");
        Ok(())
    }

    fn updated_definition(
        &self,
        snapshot: &Snapshot,
        id: &str,
        data: ReportData,
    ) -> ServiceResult<ReportDefinition> {
        let before = &snapshot
            .report(id)
            .ok_or_else(|| ServiceError::not_found(EntityKind::Report, id))?
            .value;

        if before.kind() != data.kind() {
            return Err(ValidationError::KindChange {
                report_id: id.to_string(),
                from: before.kind(),
                to: data.kind(),
            }
            .into());
        }

        if let ReportData::Combined(combined) = &data {
            if combined.contains(id) {
                return Err(ValidationError::NotCombinable {
                    report_id: id.to_string(),
                    reason: NotCombinableReason::CombinedMember,
                }
                .into());
            }
            validate_combined_members(combined, before.collection_id.as_deref(), |member| {
                snapshot.report(member).map(|stored| stored.value.clone())
            })?;
        }

        Ok(ReportDefinition {
            last_modified: Some(Utc::now()),
            data,
            ..before.clone()
        })
    }

    /// Reject or cascade `change`, then commit it in one batch.
    fn commit_change(&self, snapshot: &Snapshot, change: &Change, force: bool) -> ServiceResult<()> {
        let conflicts = compute_dependents(snapshot, change);
        if !conflicts.is_empty() {
            if !force {
                debug!(conflicts = conflicts.len(), "rejecting change with dependents");
                return Err(ServiceError::Conflict(conflicts));
            }
            info!(dependents = conflicts.len(), "cascading change to dependents");
        }

        let batch = apply_with_cascade(snapshot, change)?;
        self.store.commit(batch)?;
        Ok(())
    }

    /// Resolve the members of a combined payload from the store and validate them.
    fn resolve_members(
        &self,
        data: &CombinedReportData,
        collection_id: Option<&str>,
    ) -> ServiceResult<Vec<ReportDefinition>> {
        let mut stored = HashMap::new();
        for id in data.member_ids() {
            if let Some(entry) = self.store.get::<ReportDefinition>(id)? {
                stored.insert(id.to_string(), entry.value);
            }
        }
        let members =
            validate_combined_members(data, collection_id, |id| stored.get(id).cloned())?;
        Ok(members)
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    /// Evaluate stored report `id` under `additional` filters.
    ///
    /// Combined members that were deleted since the combined report was
    /// saved, or that no longer fit the group, are listed as excluded.
    pub fn evaluate_report(
        &self,
        id: &str,
        additional: &[ReportFilter],
    ) -> ServiceResult<EvaluatedReport> {
        let report = self.get_report(id)?;

        if let Some(data) = report.combined() {
            let mut members = Vec::new();
            let mut missing = Vec::new();
            for member_id in data.member_ids() {
                match self.store.get::<ReportDefinition>(member_id)? {
                    Some(stored) => members.push(stored.value),
                    None => missing.push(ExcludedMember {
                        report_id: member_id.to_string(),
                        reason: "report no longer exists".to_string(),
                    }),
                }
            }

            let mut result = self.combined_evaluator().evaluate(&members, additional);
            result.excluded.splice(0..0, missing);
            return Ok(EvaluatedReport::Combined { report, result });
        }

        let Some(data) = report.single() else {
            return Err(ServiceError::BadRequest(format!(
                "report '{}' has no evaluable data",
                id
            )));
        };
        let (effective, filters) = route_filters(&self.evaluator, &report, data, additional);
        let result = self.evaluator.evaluate(&report, &effective)?;
        Ok(EvaluatedReport::Single {
            report,
            result,
            filters,
        })
    }

    /// Evaluate a combined payload that has not been saved.
    ///
    /// Unlike stored combined reports, unknown or incompatible members are
    /// a validation error here.
    pub fn evaluate_unsaved_combined(
        &self,
        data: &CombinedReportData,
        collection_id: Option<&str>,
        additional: &[ReportFilter],
    ) -> ServiceResult<CombinedResult> {
        let members = self.resolve_members(data, collection_id)?;
        Ok(self.combined_evaluator().evaluate(&members, additional))
    }

    fn combined_evaluator(&self) -> CombinedEvaluator<'_, E> {
        CombinedEvaluator::new(&self.evaluator).with_bucket_limit(self.settings.bucket_limit)
    }

    // ---------------------------------------------------------------------
    // Dashboards, alerts, collections
    // ---------------------------------------------------------------------

    pub fn create_dashboard(
        &self,
        name: impl Into<String>,
        collection_id: Option<String>,
        report_ids: Vec<String>,
    ) -> ServiceResult<Dashboard> {
        if let Some(collection_id) = &collection_id {
            self.require_collection(collection_id)?;
        }
        for report_id in &report_ids {
            self.get_report(report_id)?;
        }

        let dashboard = Dashboard {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            collection_id,
            report_ids,
        };
        let mut batch = WriteBatch::new();
        batch.put(&dashboard, Expected::Absent)?;
        self.store.commit(batch)?;
        Ok(dashboard)
    }

    pub fn delete_dashboard(&self, id: &str) -> ServiceResult<()> {
        let stored = self
            .store
            .get::<Dashboard>(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Dashboard, id))?;
        let mut batch = WriteBatch::new();
        batch.delete(EntityKind::Dashboard, id, Expected::Revision(stored.revision));
        self.store.commit(batch)?;
        Ok(())
    }

    /// Create a threshold alert on a single process number report.
    pub fn create_alert(
        &self,
        name: impl Into<String>,
        report_id: &str,
        threshold: f64,
    ) -> ServiceResult<Alert> {
        let report = self
            .store
            .get::<ReportDefinition>(report_id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Report, report_id))?;
        validate_alert_target(&report.value)?;

        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            report_id: report_id.to_string(),
            threshold,
        };
        let mut batch = WriteBatch::new();
        batch.put(&alert, Expected::Absent)?;
        // The report must not change between the check and the write.
        batch.put(&report.value, Expected::Revision(report.revision))?;
        self.store.commit(batch)?;
        Ok(alert)
    }

    pub fn delete_alert(&self, id: &str) -> ServiceResult<()> {
        let stored = self
            .store
            .get::<Alert>(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Alert, id))?;
        let mut batch = WriteBatch::new();
        batch.delete(EntityKind::Alert, id, Expected::Revision(stored.revision));
        self.store.commit(batch)?;
        Ok(())
    }

    pub fn create_collection(&self, name: impl Into<String>) -> ServiceResult<Collection> {
        let collection = Collection {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        };
        let mut batch = WriteBatch::new();
        batch.put(&collection, Expected::Absent)?;
        self.store.commit(batch)?;
        Ok(collection)
    }

    /// Dependents a deletion of collection `id` would remove.
    pub fn collection_delete_conflicts(&self, id: &str) -> ServiceResult<ConflictSet> {
        let snapshot = Snapshot::load(&self.store)?;
        if snapshot.collection(id).is_none() {
            return Err(ServiceError::not_found(EntityKind::Collection, id));
        }
        Ok(compute_dependents(&snapshot, &Change::DeleteCollection(id.to_string())))
    }

    /// Delete collection `id`.
    ///
    /// Without `force`, fails while the collection still holds reports or
    /// dashboards. With `force`, they are deleted too, together with their
    /// own dependents.
    pub fn delete_collection(&self, id: &str, force: bool) -> ServiceResult<()> {
        let snapshot = Snapshot::load(&self.store)?;
        if snapshot.collection(id).is_none() {
            return Err(ServiceError::not_found(EntityKind::Collection, id));
        }

        self.commit_change(&snapshot, &Change::DeleteCollection(id.to_string()), force)?;
        info!(collection_id = %id, force, "deleted collection");
        Ok(())
    }

    fn require_collection(&self, id: &str) -> ServiceResult<()> {
        match self.store.get::<Collection>(id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(EntityKind::Collection, id)),
        }
    }
}
