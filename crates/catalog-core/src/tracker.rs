//! Per-transaction change tracking.
//!
//! The tracker is the arena of staged mutations a unit of work reads at
//! commit time. Entries keep insertion order, which is also the order in
//! which entity events are published.

use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::DomainError;
use crate::store::{EntityRecord, Mutation};

/// Tracking state of one entity within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Loaded and not changed.
    Unchanged,
    /// Staged for insertion.
    Added,
    /// Staged for overwrite.
    Modified,
    /// Staged for removal.
    Deleted,
}

impl EntryState {
    /// Whether this state carries a change that commit must persist.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

/// A tracked entity snapshot and its state.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntry {
    /// Snapshot as of the last staging call.
    pub record: EntityRecord,
    /// Tracking state.
    pub state: EntryState,
}

impl TrackedEntry {
    /// The durable write this entry requires, if any.
    #[must_use]
    pub fn to_mutation(&self) -> Option<Mutation> {
        match self.state {
            EntryState::Added => Some(Mutation::Insert(self.record.clone())),
            EntryState::Modified => Some(Mutation::Update(self.record.clone())),
            EntryState::Deleted => Some(Mutation::Delete {
                entity_name: self.record.entity_name.clone(),
                id: self.record.id,
            }),
            EntryState::Unchanged => None,
        }
    }
}

/// Arena of tracked entities for one transaction.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: Vec<TrackedEntry>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, entity_name: &str, id: Uuid) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.record.id == id && e.record.entity_name == entity_name)
    }

    /// Returns the tracked entry for an entity.
    #[must_use]
    pub fn get(&self, entity_name: &str, id: Uuid) -> Option<&TrackedEntry> {
        self.position(entity_name, id).map(|i| &self.entries[i])
    }

    /// Starts tracking a loaded entity as `Unchanged`. An entity that is
    /// already tracked keeps its current entry.
    pub fn attach(&mut self, record: EntityRecord) {
        if self.position(&record.entity_name, record.id).is_none() {
            self.entries.push(TrackedEntry {
                record,
                state: EntryState::Unchanged,
            });
        }
    }

    /// Stages an insertion.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the entity is already tracked.
    pub fn stage_add(&mut self, record: EntityRecord) -> Result<(), DomainError> {
        if self.position(&record.entity_name, record.id).is_some() {
            return Err(DomainError::Conflict(format!(
                "{} {} is already tracked",
                record.entity_name, record.id
            )));
        }
        self.entries.push(TrackedEntry {
            record,
            state: EntryState::Added,
        });
        Ok(())
    }

    /// Stages an overwrite. An entity still staged for insertion stays
    /// `Added` with the newer snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the entity is staged for deletion.
    pub fn stage_update(&mut self, record: EntityRecord) -> Result<(), DomainError> {
        let Some(i) = self.position(&record.entity_name, record.id) else {
            self.entries.push(TrackedEntry {
                record,
                state: EntryState::Modified,
            });
            return Ok(());
        };

        let entry = &mut self.entries[i];
        entry.state = match entry.state {
            EntryState::Added => EntryState::Added,
            EntryState::Unchanged | EntryState::Modified => EntryState::Modified,
            EntryState::Deleted => {
                return Err(DomainError::Conflict(format!(
                    "{} {} is staged for deletion",
                    record.entity_name, record.id
                )));
            }
        };
        entry.record = record;
        Ok(())
    }

    /// Stages a removal. An entity still staged for insertion is simply
    /// forgotten.
    pub fn stage_delete(&mut self, record: EntityRecord) {
        match self.position(&record.entity_name, record.id) {
            Some(i) if self.entries[i].state == EntryState::Added => {
                self.entries.remove(i);
            }
            Some(i) => {
                self.entries[i].state = EntryState::Deleted;
                self.entries[i].record = record;
            }
            None => self.entries.push(TrackedEntry {
                record,
                state: EntryState::Deleted,
            }),
        }
    }

    /// Entries with a pending change, in insertion order.
    #[must_use]
    pub fn pending(&self) -> Vec<TrackedEntry> {
        self.entries
            .iter()
            .filter(|e| e.state.is_pending())
            .cloned()
            .collect()
    }

    /// Number of entries with a pending change.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.state.is_pending()).count()
    }

    /// Marks every change as durable: deleted entries are detached, the rest
    /// become `Unchanged`.
    pub fn accept_changes(&mut self) {
        self.entries.retain(|e| e.state != EntryState::Deleted);
        for entry in &mut self.entries {
            entry.state = EntryState::Unchanged;
        }
    }

    /// Forgets every tracked entity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Locks a shared tracker. A poisoned lock is recovered: the tracker holds
/// plain data and every mutation leaves it consistent.
pub(crate) fn lock(tracker: &Mutex<ChangeTracker>) -> MutexGuard<'_, ChangeTracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}
