//! Definition store.
//!
//! Reports, dashboards, alerts and collections are stored as JSON records
//! keyed by kind and id. Every record carries a content [`Revision`].
//!
//! # Design
//!
//! - Reads return the value together with its revision
//! - Writes go through a [`WriteBatch`]: every mutation states the revision
//!   it expects to replace, and the batch is applied all-or-nothing
//! - A batch whose expectations do not hold is rejected untouched with
//!   [`StoreError::RevisionConflict`]
//!
//! Callers read, decide, then commit one batch covering an entity and all
//! its dependents.

mod hash;
mod memory;
mod sqlite;

pub use hash::Revision;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use serde::{de::DeserializeOwned, Serialize};

use crate::model::{Alert, Collection, Dashboard, ReportDefinition};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to determine data directory")]
    NoDataDir,

    #[error("{kind} '{id}' was modified concurrently")]
    RevisionConflict { kind: EntityKind, id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Kind of stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Report,
    Dashboard,
    Alert,
    Collection,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Report => "report",
            EntityKind::Dashboard => "dashboard",
            EntityKind::Alert => "alert",
            EntityKind::Collection => "collection",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored JSON record and its revision.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub value: String,
    pub revision: Revision,
}

/// A decoded record and its revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub value: T,
    pub revision: Revision,
}

/// Entity types the store knows how to key.
pub trait StoredEntity: Serialize + DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

impl StoredEntity for ReportDefinition {
    const KIND: EntityKind = EntityKind::Report;

    fn id(&self) -> &str {
        &self.id
    }
}

impl StoredEntity for Dashboard {
    const KIND: EntityKind = EntityKind::Dashboard;

    fn id(&self) -> &str {
        &self.id
    }
}

impl StoredEntity for Alert {
    const KIND: EntityKind = EntityKind::Alert;

    fn id(&self) -> &str {
        &self.id
    }
}

impl StoredEntity for Collection {
    const KIND: EntityKind = EntityKind::Collection;

    fn id(&self) -> &str {
        &self.id
    }
}

/// What a mutation expects to find before it applies.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// No check.
    Any,
    /// The entity must not exist yet.
    Absent,
    /// The entity must exist with exactly this revision.
    Revision(Revision),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Put {
        kind: EntityKind,
        id: String,
        value: String,
    },
    Delete {
        kind: EntityKind,
        id: String,
    },
}

impl Write {
    pub fn kind(&self) -> EntityKind {
        match self {
            Write::Put { kind, .. } | Write::Delete { kind, .. } => *kind,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Write::Put { id, .. } | Write::Delete { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub write: Write,
    pub expected: Expected,
}

/// Mutations applied together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing whatever `expected` describes.
    pub fn put<T: StoredEntity>(&mut self, value: &T, expected: Expected) -> StoreResult<()> {
        let json = serde_json::to_string(value)?;
        self.mutations.push(Mutation {
            write: Write::Put {
                kind: T::KIND,
                id: value.id().to_string(),
                value: json,
            },
            expected,
        });
        Ok(())
    }

    pub fn delete(&mut self, kind: EntityKind, id: &str, expected: Expected) {
        self.mutations.push(Mutation {
            write: Write::Delete {
                kind,
                id: id.to_string(),
            },
            expected,
        });
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Check one mutation's expectation against the current revision.
pub(crate) fn check_expected(
    mutation: &Mutation,
    current: Option<&Revision>,
) -> StoreResult<()> {
    let holds = match (&mutation.expected, current) {
        (Expected::Any, _) => true,
        (Expected::Absent, None) => true,
        (Expected::Revision(expected), Some(current)) => expected == current,
        _ => false,
    };
    if holds {
        Ok(())
    } else {
        Err(StoreError::RevisionConflict {
            kind: mutation.write.kind(),
            id: mutation.write.id().to_string(),
        })
    }
}

/// Storage for report definitions and their dependents.
pub trait DefinitionStore: Send + Sync {
    fn get_raw(&self, kind: EntityKind, id: &str) -> StoreResult<Option<RawEntry>>;

    /// Every record of a kind, ordered by id.
    fn list_raw(&self, kind: EntityKind) -> StoreResult<Vec<(String, RawEntry)>>;

    /// Apply a batch atomically.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

/// Typed access on top of [`DefinitionStore`].
pub trait StoreExt: DefinitionStore {
    fn get<T: StoredEntity>(&self, id: &str) -> StoreResult<Option<Stored<T>>> {
        match self.get_raw(T::KIND, id)? {
            Some(entry) => Ok(Some(Stored {
                value: serde_json::from_str(&entry.value)?,
                revision: entry.revision,
            })),
            None => Ok(None),
        }
    }

    fn list<T: StoredEntity>(&self) -> StoreResult<Vec<Stored<T>>> {
        self.list_raw(T::KIND)?
            .into_iter()
            .map(|(_, entry)| {
                Ok(Stored {
                    value: serde_json::from_str(&entry.value)?,
                    revision: entry.revision,
                })
            })
            .collect()
    }

    /// Store a single value with no revision check.
    fn put<T: StoredEntity>(&self, value: &T) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(value, Expected::Any)?;
        self.commit(batch)
    }
}

impl<S: DefinitionStore + ?Sized> StoreExt for S {}
