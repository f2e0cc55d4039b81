//! SQLite store persistence and revision checks.

#[path = "../common/mod.rs"]
mod common;

use common::{combined_report, count_report, evaluator};
use optimize_reports::model::{
    Collection, CombinedReportData, Dashboard, GroupBy, ReportData, ReportDefinition,
    Visualization,
};
use optimize_reports::service::NewReport;
use optimize_reports::store::{
    DefinitionStore, EntityKind, Expected, Revision, SqliteStore, StoreError, StoreExt,
    WriteBatch,
};
use optimize_reports::ReportService;
use tempfile::TempDir;

fn number_report(id: &str) -> ReportDefinition {
    count_report(id, "invoice", GroupBy::None, Visualization::Number)
}

#[test]
fn test_reopen_keeps_values_and_revisions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("reports.db");

    let report = number_report("r1");
    let collection = Collection {
        id: "c1".to_string(),
        name: "Finance".to_string(),
    };
    {
        let store = SqliteStore::open(&path).unwrap();
        let mut batch = WriteBatch::new();
        batch.put(&report, Expected::Absent).unwrap();
        batch.put(&collection, Expected::Absent).unwrap();
        batch.put(&number_report("r0"), Expected::Absent).unwrap();
        store.commit(batch).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let stored = store.get::<ReportDefinition>("r1").unwrap().unwrap();
    assert_eq!(stored.value, report);
    assert_eq!(stored.revision, Revision::compute(&report).unwrap());
    assert_eq!(store.get::<Collection>("c1").unwrap().unwrap().value, collection);

    let ids: Vec<String> = store
        .list::<ReportDefinition>()
        .unwrap()
        .into_iter()
        .map(|s| s.value.id)
        .collect();
    assert_eq!(ids, vec!["r0", "r1"]);
    assert_eq!(store.count(EntityKind::Collection).unwrap(), 1);
}

#[test]
fn test_stale_revision_rejects_batch() {
    let store = SqliteStore::open_in_memory().unwrap();
    let original = number_report("r1");
    store.put(&original).unwrap();
    let seen = store.get::<ReportDefinition>("r1").unwrap().unwrap().revision;

    let mut renamed = original.clone();
    renamed.name = "Renamed".to_string();
    store.put(&renamed).unwrap();

    let mut batch = WriteBatch::new();
    batch.put(&combined_report("c1", &["r1"]), Expected::Absent).unwrap();
    batch.delete(EntityKind::Report, "r1", Expected::Revision(seen));
    let err = store.commit(batch).unwrap_err();

    assert!(matches!(
        err,
        StoreError::RevisionConflict {
            kind: EntityKind::Report,
            ref id,
        } if id == "r1"
    ));
    assert!(store.get::<ReportDefinition>("c1").unwrap().is_none());
    assert_eq!(
        store.get::<ReportDefinition>("r1").unwrap().unwrap().value.name,
        "Renamed"
    );
}

#[test]
fn test_unsupported_schema_version_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports.db");
    SqliteStore::open(&path).unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute("UPDATE meta SET value = '99' WHERE key = 'version'", [])
        .unwrap();
    drop(conn);

    let err = SqliteStore::open(&path).unwrap_err();
    assert!(err.to_string().contains("schema version 99"));
}

#[test]
fn test_forced_delete_persists_cascade() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reports.db");

    let (member, combined, board) = {
        let service = ReportService::new(SqliteStore::open(&path).unwrap(), evaluator());
        let number = |name: &str| {
            service
                .create_report(NewReport::new(name, number_report("-").data))
                .unwrap()
        };
        let member = number("Invoices");
        let other = number("More invoices");
        let combined = service
            .create_report(NewReport::new(
                "Both",
                ReportData::Combined(CombinedReportData::from_ids([&member.id, &other.id])),
            ))
            .unwrap();
        let board = service
            .create_dashboard("Ops", None, vec![member.id.clone()])
            .unwrap();

        assert_eq!(
            service.delete_report(&member.id, false).unwrap_err().status(),
            409
        );
        service.delete_report(&member.id, true).unwrap();
        (member, combined, board)
    };

    let store = SqliteStore::open(&path).unwrap();
    assert!(store.get::<ReportDefinition>(&member.id).unwrap().is_none());
    let combined = store
        .get::<ReportDefinition>(&combined.id)
        .unwrap()
        .unwrap()
        .value;
    assert_eq!(combined.combined().unwrap().member_ids().len(), 1);
    let board = store.get::<Dashboard>(&board.id).unwrap().unwrap().value;
    assert!(board.report_ids.is_empty());
}
