//! SQLite-backed definition store.
//!
//! # Design
//!
//! - One `entities` table keyed by `(kind, id)`, holding the JSON value and
//!   its revision
//! - Versioned schema: a version mismatch refuses to open rather than
//!   dropping stored definitions
//! - Batches run inside one transaction; revision checks happen inside it

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::store::{
    check_expected, DefinitionStore, EntityKind, RawEntry, Revision, StoreError, StoreResult,
    Write, WriteBatch,
};

/// Current schema version. Bump this when the table layout changes.
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        info!(path = %path.display(), "opened sqlite store");
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    /// Default database location under the user's data directory.
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(base.join("optimize-reports").join("reports.db"))
    }

    fn init(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entities (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                revision TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                row.get(0)
            })
            .optional()?;

        match stored_version {
            Some(v) if v == SCHEMA_VERSION.to_string() => {}
            Some(v) => {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "store schema version {} is not supported (expected {})",
                        v, SCHEMA_VERSION
                    ),
                )));
            }
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('version', ?)",
                    params![SCHEMA_VERSION.to_string()],
                )?;
            }
        }

        Ok(())
    }

    /// Number of stored entities of a kind.
    pub fn count(&self, kind: EntityKind) -> StoreResult<usize> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM entities WHERE kind = ?",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl DefinitionStore for SqliteStore {
    fn get_raw(&self, kind: EntityKind, id: &str) -> StoreResult<Option<RawEntry>> {
        let row: Option<(String, String)> = self
            .conn
            .lock()
            .query_row(
                "SELECT value, revision FROM entities WHERE kind = ? AND id = ?",
                params![kind.as_str(), id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(value, revision)| RawEntry {
            value,
            revision: Revision::from(revision),
        }))
    }

    fn list_raw(&self, kind: EntityKind) -> StoreResult<Vec<(String, RawEntry)>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, value, revision FROM entities WHERE kind = ? ORDER BY id")?;
        let rows = stmt
            .query_map(params![kind.as_str()], |row| {
                let id: String = row.get(0)?;
                let value: String = row.get(1)?;
                let revision: String = row.get(2)?;
                Ok((
                    id,
                    RawEntry {
                        value,
                        revision: Revision::from(revision),
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for mutation in batch.mutations() {
            let current: Option<String> = tx
                .query_row(
                    "SELECT revision FROM entities WHERE kind = ? AND id = ?",
                    params![mutation.write.kind().as_str(), mutation.write.id()],
                    |row| row.get(0),
                )
                .optional()?;
            check_expected(mutation, current.map(Revision::from).as_ref())?;
        }

        for mutation in batch.mutations() {
            match &mutation.write {
                Write::Put { kind, id, value } => {
                    let revision = Revision::of_json(value);
                    tx.execute(
                        "INSERT OR REPLACE INTO entities (kind, id, revision, value) VALUES (?, ?, ?, ?)",
                        params![kind.as_str(), id, revision.as_str(), value],
                    )?;
                }
                Write::Delete { kind, id } => {
                    tx.execute(
                        "DELETE FROM entities WHERE kind = ? AND id = ?",
                        params![kind.as_str(), id],
                    )?;
                }
            }
        }

        tx.commit()?;
        debug!(mutations = batch.len(), "committed batch");
        Ok(())
    }
}
