use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use backoffice_core::{DomainError, RecordId};

use super::family::Family;
use super::record::Record;

/// One staged mutation.
///
/// Both variants carry the version the writer read, so a commit fails when the
/// row changed underneath it.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Insert (`id == 0`, `version == 0`) or replace a row.
    Put(Record),
    /// Remove a row.
    Remove {
        family: Family,
        id: RecordId,
        version: u64,
    },
}

impl Write {
    pub fn key(&self) -> (Family, RecordId) {
        match self {
            Write::Put(record) => record.key(),
            Write::Remove { family, id, .. } => (*family, *id),
        }
    }
}

/// Writes applied all-or-nothing by [`RecordStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{family} {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        family: Family,
        id: RecordId,
        expected: u64,
        found: u64,
    },

    #[error("{family} {id} does not exist")]
    Missing { family: Family, id: RecordId },

    #[error("{family} {id} is still referenced by {by_family} {by_id}")]
    StillReferenced {
        family: Family,
        id: RecordId,
        by_family: Family,
        by_id: RecordId,
    },

    #[error("record store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Missing { .. } => DomainError::NotFound,
            StoreError::Poisoned => DomainError::invariant(e.to_string()),
            StoreError::Conflict { .. } | StoreError::StillReferenced { .. } => {
                DomainError::conflict(e.to_string())
            }
        }
    }
}

/// Storage for record families.
pub trait RecordStore: Send + Sync {
    fn get(&self, family: Family, id: RecordId) -> Result<Option<Record>, StoreError>;

    /// All rows of a family, deleted ones included, ordered by id.
    fn list(&self, family: Family) -> Result<Vec<Record>, StoreError>;

    /// Apply a batch atomically and return the rows it wrote.
    ///
    /// Fails without changing anything when a version does not match, a written
    /// row points at a missing row, or a removed row is still referenced.
    fn commit(&self, batch: WriteBatch) -> Result<Vec<Record>, StoreError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn get(&self, family: Family, id: RecordId) -> Result<Option<Record>, StoreError> {
        (**self).get(family, id)
    }

    fn list(&self, family: Family) -> Result<Vec<Record>, StoreError> {
        (**self).list(family)
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<Record>, StoreError> {
        (**self).commit(batch)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    rows: BTreeMap<Family, BTreeMap<RecordId, Record>>,
    last_ids: BTreeMap<Family, i64>,
}

impl StoreState {
    fn row(&self, key: (Family, RecordId)) -> Option<&Record> {
        self.rows.get(&key.0).and_then(|rows| rows.get(&key.1))
    }
}

/// In-memory record store.
///
/// A commit holds the write lock for its whole validate-then-apply step, so
/// readers see either none or all of a batch.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<StoreState>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows across families.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .map(|s| s.rows.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, family: Family, id: RecordId) -> Result<Option<Record>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.row((family, id)).cloned())
    }

    fn list(&self, family: Family) -> Result<Vec<Record>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state
            .rows
            .get(&family)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<Record>, StoreError> {
        if batch.is_empty() {
            return Ok(vec![]);
        }

        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;

        // Stage the batch as an overlay; `None` marks a removal.
        let mut overlay: HashMap<(Family, RecordId), Option<Record>> = HashMap::new();
        let mut order: Vec<(Family, RecordId)> = Vec::new();
        let mut last_ids = state.last_ids.clone();

        for write in batch.writes {
            match write {
                Write::Put(mut record) => {
                    if record.id.is_new() {
                        let last = last_ids.entry(record.family).or_insert(0);
                        *last += 1;
                        record.id = RecordId::new(*last);
                        record.version = 1;
                    } else {
                        let key = record.key();
                        let found = current_version(&state, &overlay, key);
                        if found == 0 {
                            return Err(StoreError::Missing {
                                family: key.0,
                                id: key.1,
                            });
                        }
                        if found != record.version {
                            return Err(StoreError::Conflict {
                                family: key.0,
                                id: key.1,
                                expected: record.version,
                                found,
                            });
                        }
                        record.version = found + 1;
                    }
                    let key = record.key();
                    order.push(key);
                    overlay.insert(key, Some(record));
                }
                Write::Remove {
                    family,
                    id,
                    version,
                } => {
                    let key = (family, id);
                    let found = current_version(&state, &overlay, key);
                    if found == 0 {
                        return Err(StoreError::Missing { family, id });
                    }
                    if found != version {
                        return Err(StoreError::Conflict {
                            family,
                            id,
                            expected: version,
                            found,
                        });
                    }
                    overlay.insert(key, None);
                }
            }
        }

        // Every written row must point at rows that exist after the batch.
        for staged in overlay.values().flatten() {
            for target in staged.references() {
                let exists = match overlay.get(&target) {
                    Some(slot) => slot.is_some(),
                    None => state.row(target).is_some(),
                };
                if !exists {
                    return Err(StoreError::Missing {
                        family: target.0,
                        id: target.1,
                    });
                }
            }
        }

        // No surviving row may point at a removed one.
        let removed: Vec<(Family, RecordId)> = overlay
            .iter()
            .filter_map(|(key, slot)| slot.is_none().then_some(*key))
            .collect();
        if !removed.is_empty() {
            let survivors = state
                .rows
                .values()
                .flat_map(BTreeMap::values)
                .filter(|row| !overlay.contains_key(&row.key()))
                .chain(overlay.values().flatten());
            for row in survivors {
                if let Some(target) = removed.iter().find(|key| row.references_key(**key)) {
                    return Err(StoreError::StillReferenced {
                        family: target.0,
                        id: target.1,
                        by_family: row.family,
                        by_id: row.id,
                    });
                }
            }
        }

        // Apply.
        let mut written = Vec::with_capacity(order.len());
        for (key, slot) in overlay {
            let rows = state.rows.entry(key.0).or_default();
            match slot {
                Some(record) => {
                    rows.insert(key.1, record);
                }
                None => {
                    rows.remove(&key.1);
                }
            }
        }
        for key in order {
            if let Some(row) = state.row(key) {
                if !written.iter().any(|r: &Record| r.key() == key) {
                    written.push(row.clone());
                }
            }
        }
        state.last_ids = last_ids;

        Ok(written)
    }
}

fn current_version(
    state: &StoreState,
    overlay: &HashMap<(Family, RecordId), Option<Record>>,
    key: (Family, RecordId),
) -> u64 {
    match overlay.get(&key) {
        Some(Some(staged)) => staged.version,
        Some(None) => 0,
        None => state.row(key).map_or(0, |row| row.version),
    }
}
