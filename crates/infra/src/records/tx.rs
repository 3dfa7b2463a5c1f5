use std::collections::BTreeMap;

use backoffice_core::RecordId;

use super::family::Family;
use super::record::Record;
use super::store::{RecordStore, StoreError, Write, WriteBatch};

/// Staged multi-row change against a [`RecordStore`].
///
/// Reads see the transaction's own writes. Nothing reaches the store until
/// [`RecordTx::commit`]; dropping the transaction discards every staged write.
pub struct RecordTx<'s, S: RecordStore + ?Sized> {
    store: &'s S,
    staged: BTreeMap<(Family, RecordId), Staged>,
    inserts: Vec<Record>,
    committed: bool,
}

enum Staged {
    Put(Record),
    Remove { version: u64 },
}

impl<'s, S: RecordStore + ?Sized> RecordTx<'s, S> {
    pub fn begin(store: &'s S) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
            inserts: Vec::new(),
            committed: false,
        }
    }

    pub fn get(&self, family: Family, id: RecordId) -> Result<Option<Record>, StoreError> {
        match self.staged.get(&(family, id)) {
            Some(Staged::Put(record)) => Ok(Some(record.clone())),
            Some(Staged::Remove { .. }) => Ok(None),
            None => self.store.get(family, id),
        }
    }

    /// Like [`RecordTx::get`], failing when the row is absent.
    pub fn require(&self, family: Family, id: RecordId) -> Result<Record, StoreError> {
        self.get(family, id)?
            .ok_or(StoreError::Missing { family, id })
    }

    /// Stage an insert (`id == 0`) or a replacement of a row read earlier.
    pub fn put(&mut self, record: Record) {
        if record.id.is_new() {
            self.inserts.push(record);
        } else {
            self.staged.insert(record.key(), Staged::Put(record));
        }
    }

    /// Stage removal of a row read earlier.
    pub fn remove(&mut self, record: &Record) {
        self.staged.insert(
            record.key(),
            Staged::Remove {
                version: record.version,
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.inserts.is_empty()
    }

    /// Write everything staged in one batch.
    pub fn commit(mut self) -> Result<Vec<Record>, StoreError> {
        self.committed = true;

        let mut batch = WriteBatch::new();
        for record in std::mem::take(&mut self.inserts) {
            batch.push(Write::Put(record));
        }
        for ((family, id), staged) in std::mem::take(&mut self.staged) {
            batch.push(match staged {
                Staged::Put(record) => Write::Put(record),
                Staged::Remove { version } => Write::Remove {
                    family,
                    id,
                    version,
                },
            });
        }

        self.store.commit(batch)
    }
}

impl<S: RecordStore + ?Sized> Drop for RecordTx<'_, S> {
    fn drop(&mut self) {
        if !self.committed && !self.is_empty() {
            tracing::debug!(
                staged = self.staged.len() + self.inserts.len(),
                "record transaction discarded"
            );
        }
    }
}
