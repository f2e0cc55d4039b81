// src/store/memory.rs
use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::store::{
    check_expected, DefinitionStore, EntityKind, RawEntry, Revision, StoreResult, Write,
    WriteBatch,
};

type Key = (EntityKind, String);

/// Store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<Key, RawEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl DefinitionStore for InMemoryStore {
    fn get_raw(&self, kind: EntityKind, id: &str) -> StoreResult<Option<RawEntry>> {
        Ok(self.entries.read().get(&(kind, id.to_string())).cloned())
    }

    fn list_raw(&self, kind: EntityKind) -> StoreResult<Vec<(String, RawEntry)>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), entry)| (id.clone(), entry.clone()))
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut entries = self.entries.write();

        for mutation in batch.mutations() {
            let key = (mutation.write.kind(), mutation.write.id().to_string());
            check_expected(mutation, entries.get(&key).map(|e| &e.revision))?;
        }

        for mutation in batch.mutations() {
            match &mutation.write {
                Write::Put { kind, id, value } => {
                    entries.insert(
                        (*kind, id.clone()),
                        RawEntry {
                            value: value.clone(),
                            revision: Revision::of_json(value),
                        },
                    );
                }
                Write::Delete { kind, id } => {
                    entries.remove(&(*kind, id.clone()));
                }
            }
        }

        debug!(mutations = batch.len(), "committed batch");
        Ok(())
    }
}
