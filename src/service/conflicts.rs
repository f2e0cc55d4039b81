//! Dependents of report and collection changes.
//!
//! A change is planned in two phases against one [`Snapshot`] of the store:
//!
//! 1. [`compute_dependents`] lists every entity the change would orphan or
//!    invalidate
//! 2. [`apply_with_cascade`] turns the change and the repair of those
//!    dependents into one [`WriteBatch`]
//!
//! Every write in the batch expects the revision seen in the snapshot, so a
//! concurrent modification rejects the batch as a whole.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    Alert, Collection, ConflictSet, ConflictedItemType, Dashboard, ReportDefinition, ReportKind,
};
use crate::store::{
    DefinitionStore, EntityKind, Expected, StoreExt, StoreResult, Stored, StoredEntity, WriteBatch,
};
use crate::validation::{check_combinable, validate_alert_target};

/// Every stored definition, keyed by id, as read at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    reports: BTreeMap<String, Stored<ReportDefinition>>,
    dashboards: BTreeMap<String, Stored<Dashboard>>,
    alerts: BTreeMap<String, Stored<Alert>>,
    collections: BTreeMap<String, Stored<Collection>>,
}

fn keyed<T: StoredEntity>(entries: Vec<Stored<T>>) -> BTreeMap<String, Stored<T>> {
    entries
        .into_iter()
        .map(|entry| (entry.value.id().to_string(), entry))
        .collect()
}

impl Snapshot {
    pub fn load<S: DefinitionStore + ?Sized>(store: &S) -> StoreResult<Self> {
        Ok(Self {
            reports: keyed(store.list::<ReportDefinition>()?),
            dashboards: keyed(store.list::<Dashboard>()?),
            alerts: keyed(store.list::<Alert>()?),
            collections: keyed(store.list::<Collection>()?),
        })
    }

    pub fn report(&self, id: &str) -> Option<&Stored<ReportDefinition>> {
        self.reports.get(id)
    }

    pub fn collection(&self, id: &str) -> Option<&Stored<Collection>> {
        self.collections.get(id)
    }

    fn combined_reports_with<'a>(
        &'a self,
        report_id: &'a str,
    ) -> impl Iterator<Item = &'a ReportDefinition> + 'a {
        self.reports
            .values()
            .map(|stored| &stored.value)
            .filter(move |report| report.combined().is_some_and(|c| c.contains(report_id)))
    }
}

/// A change to plan against a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace a stored report with this definition (same id).
    UpdateReport(ReportDefinition),
    DeleteReport(String),
    DeleteCollection(String),
}

/// What a change removes or detaches.
#[derive(Debug, Default)]
struct Impact {
    /// Reports deleted besides the target of a report deletion.
    removed_reports: BTreeSet<String>,
    removed_dashboards: BTreeSet<String>,
    removed_alerts: BTreeSet<String>,
    /// Surviving combined report id to the members it loses.
    detached_members: BTreeMap<String, BTreeSet<String>>,
    /// Surviving dashboard id to the tiles it loses.
    detached_tiles: BTreeMap<String, BTreeSet<String>>,
}

impl Impact {
    fn of(snapshot: &Snapshot, change: &Change) -> Self {
        let mut impact = Impact::default();
        match change {
            Change::UpdateReport(after) => impact.updated(snapshot, after),
            Change::DeleteReport(id) => {
                impact.removed(snapshot, &BTreeSet::from([id.clone()]));
            }
            Change::DeleteCollection(id) => {
                let reports: BTreeSet<String> = snapshot
                    .reports
                    .values()
                    .filter(|r| r.value.collection_id.as_deref() == Some(id.as_str()))
                    .map(|r| r.value.id.clone())
                    .collect();
                impact.removed_dashboards = snapshot
                    .dashboards
                    .values()
                    .filter(|d| d.value.collection_id.as_deref() == Some(id.as_str()))
                    .map(|d| d.value.id.clone())
                    .collect();
                impact.removed(snapshot, &reports);
                impact.removed_reports = reports;
            }
        }
        impact
    }

    /// Dependents of an updated single report that it would break.
    fn updated(&mut self, snapshot: &Snapshot, after: &ReportDefinition) {
        if after.kind() == ReportKind::Combined {
            return;
        }

        for combined in snapshot.combined_reports_with(&after.id) {
            let Some(data) = combined.combined() else {
                continue;
            };
            let others: Vec<&ReportDefinition> = data
                .member_ids()
                .into_iter()
                .filter(|id| *id != after.id)
                .filter_map(|id| snapshot.report(id).map(|r| &r.value))
                .collect();

            let mut members = others.clone();
            members.push(after);
            let breaks = after.collection_id != combined.collection_id
                || (check_combinable(&others).is_ok() && check_combinable(&members).is_err());
            if breaks {
                self.detached_members
                    .entry(combined.id.clone())
                    .or_default()
                    .insert(after.id.clone());
            }
        }

        if validate_alert_target(after).is_err() {
            self.removed_alerts.extend(
                snapshot
                    .alerts
                    .values()
                    .filter(|a| a.value.report_id == after.id)
                    .map(|a| a.value.id.clone()),
            );
        }
    }

    /// Dependents of deleted reports outside the deleted set.
    fn removed(&mut self, snapshot: &Snapshot, reports: &BTreeSet<String>) {
        for id in reports {
            for combined in snapshot.combined_reports_with(id) {
                if !reports.contains(&combined.id) {
                    self.detached_members
                        .entry(combined.id.clone())
                        .or_default()
                        .insert(id.clone());
                }
            }
            for dashboard in snapshot.dashboards.values().map(|d| &d.value) {
                if dashboard.shows(id) && !self.removed_dashboards.contains(&dashboard.id) {
                    self.detached_tiles
                        .entry(dashboard.id.clone())
                        .or_default()
                        .insert(id.clone());
                }
            }
        }

        self.removed_alerts.extend(
            snapshot
                .alerts
                .values()
                .filter(|a| reports.contains(&a.value.report_id))
                .map(|a| a.value.id.clone()),
        );
    }
}

fn report_item_type(report: &ReportDefinition) -> ConflictedItemType {
    match report.kind() {
        ReportKind::Combined => ConflictedItemType::CombinedReport,
        _ => ConflictedItemType::Report,
    }
}

/// Entities `change` would orphan or invalidate.
///
/// Empty when the change can be applied without touching anything else.
pub fn compute_dependents(snapshot: &Snapshot, change: &Change) -> ConflictSet {
    let impact = Impact::of(snapshot, change);
    let mut conflicts = ConflictSet::default();

    for id in impact.removed_reports.iter().chain(impact.detached_members.keys()) {
        if let Some(stored) = snapshot.report(id) {
            conflicts.push(report_item_type(&stored.value), id, &stored.value.name);
        }
    }
    for id in impact.removed_dashboards.iter().chain(impact.detached_tiles.keys()) {
        if let Some(stored) = snapshot.dashboards.get(id) {
            conflicts.push(ConflictedItemType::Dashboard, id, &stored.value.name);
        }
    }
    for id in &impact.removed_alerts {
        if let Some(stored) = snapshot.alerts.get(id) {
            conflicts.push(ConflictedItemType::Alert, id, &stored.value.name);
        }
    }

    conflicts
}

/// One batch applying `change` and repairing every dependent.
///
/// Combined reports and dashboards lose the members they can no longer
/// hold, alerts on removed or no longer alertable reports are deleted.
pub fn apply_with_cascade(snapshot: &Snapshot, change: &Change) -> StoreResult<WriteBatch> {
    let impact = Impact::of(snapshot, change);
    let mut batch = WriteBatch::new();

    match change {
        Change::UpdateReport(after) => {
            batch.put(after, expected_revision(snapshot.report(&after.id)))?;
        }
        Change::DeleteReport(id) => {
            batch.delete(EntityKind::Report, id, expected_revision(snapshot.report(id)));
        }
        Change::DeleteCollection(id) => {
            batch.delete(EntityKind::Collection, id, expected_revision(snapshot.collection(id)));
        }
    }

    for id in &impact.removed_reports {
        batch.delete(EntityKind::Report, id, expected_revision(snapshot.report(id)));
    }
    for id in &impact.removed_dashboards {
        batch.delete(EntityKind::Dashboard, id, expected_revision(snapshot.dashboards.get(id)));
    }
    for id in &impact.removed_alerts {
        batch.delete(EntityKind::Alert, id, expected_revision(snapshot.alerts.get(id)));
    }

    for (id, members) in &impact.detached_members {
        let Some(stored) = snapshot.report(id) else {
            continue;
        };
        let mut combined = stored.value.clone();
        if let Some(data) = combined.combined_mut() {
            for member in members {
                data.remove_member(member);
            }
        }
        batch.put(&combined, Expected::Revision(stored.revision.clone()))?;
    }

    for (id, tiles) in &impact.detached_tiles {
        let Some(stored) = snapshot.dashboards.get(id) else {
            continue;
        };
        let mut dashboard = stored.value.clone();
        for tile in tiles {
            dashboard.remove_report(tile);
        }
        batch.put(&dashboard, Expected::Revision(stored.revision.clone()))?;
    }

    Ok(batch)
}

fn expected_revision<T>(stored: Option<&Stored<T>>) -> Expected {
    match stored {
        Some(stored) => Expected::Revision(stored.revision.clone()),
        None => Expected::Absent,
    }
}
