//! Entity events derived from tracked changes at commit time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::tracker::{EntryState, TrackedEntry};

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityEventKind {
    /// The entity was inserted.
    Created,
    /// The entity was overwritten.
    Updated,
    /// The entity was removed.
    Deleted,
    /// Any other tracked state; also what unrecognised wire values decode to.
    #[serde(other)]
    Unknown,
}

impl EntityEventKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<EntryState> for EntityEventKind {
    fn from(state: EntryState) -> Self {
        match state {
            EntryState::Added => Self::Created,
            EntryState::Modified => Self::Updated,
            EntryState::Deleted => Self::Deleted,
            EntryState::Unchanged => Self::Unknown,
        }
    }
}

/// Message describing one entity's mutation. Built once per staged change
/// during commit, published, then dropped; never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEvent {
    /// Kind of mutation.
    pub event_type: EntityEventKind,
    /// Entity type name.
    pub entity_name: String,
    /// Entity identifier.
    pub entity_id: Uuid,
    /// When the event was built.
    pub timestamp: DateTime<Utc>,
    /// Entity snapshot at staging time.
    pub data: Option<serde_json::Value>,
}

impl EntityEvent {
    /// Builds an event, capturing the timestamp from `clock`.
    #[must_use]
    pub fn new(
        event_type: EntityEventKind,
        entity_name: impl Into<String>,
        entity_id: Uuid,
        data: Option<serde_json::Value>,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            event_type,
            entity_name: entity_name.into(),
            entity_id,
            timestamp: clock.now(),
            data,
        }
    }

    /// Derives the event for a tracked entry.
    #[must_use]
    pub fn from_entry(entry: &TrackedEntry, clock: &dyn Clock) -> Self {
        Self::new(
            entry.state.into(),
            entry.record.entity_name.clone(),
            entry.record.id,
            Some(entry.record.data.clone()),
            clock,
        )
    }
}
