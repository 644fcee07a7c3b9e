//! Entity store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entity::Entity;
use crate::error::DomainError;

/// Stored representation of an entity: its identity, timestamps, and the
/// full serde snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Entity type name (storage partition).
    pub entity_name: String,
    /// Entity identifier.
    pub id: Uuid,
    /// Creation timestamp, used for paging order.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Serialized entity.
    pub data: serde_json::Value,
}

impl EntityRecord {
    /// Snapshots `entity` into a record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the entity fails to serialize.
    pub fn from_entity<E: Entity>(entity: &E) -> Result<Self, DomainError> {
        let data = serde_json::to_value(entity).map_err(|e| {
            DomainError::Infrastructure(format!("{} serialization failed: {e}", E::ENTITY_NAME))
        })?;
        let meta = entity.meta();
        Ok(Self {
            entity_name: E::ENTITY_NAME.to_owned(),
            id: meta.id(),
            created_at: meta.created_at(),
            updated_at: meta.updated_at(),
            data,
        })
    }

    /// Rebuilds the entity from its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the snapshot does not
    /// deserialize into `E` (including when `E` rejects it as invalid).
    pub fn to_entity<E: Entity>(&self) -> Result<E, DomainError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            DomainError::Infrastructure(format!(
                "{} {} could not be materialized: {e}",
                self.entity_name, self.id
            ))
        })
    }
}

/// One durable write, applied by [`EntityStore::persist`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a new row.
    Insert(EntityRecord),
    /// Overwrite an existing row.
    Update(EntityRecord),
    /// Remove a row.
    Delete {
        /// Entity type name.
        entity_name: String,
        /// Entity identifier.
        id: Uuid,
    },
}

impl Mutation {
    /// Entity type name of the row this mutation writes.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        match self {
            Self::Insert(record) | Self::Update(record) => &record.entity_name,
            Self::Delete { entity_name, .. } => entity_name,
        }
    }
}

/// Durable storage for entities, partitioned by entity name.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Loads one entity, or `None` if absent.
    async fn find(&self, entity_name: &str, id: Uuid) -> Result<Option<EntityRecord>, DomainError>;

    /// Loads every entity of a type. No ordering is promised.
    async fn list(&self, entity_name: &str) -> Result<Vec<EntityRecord>, DomainError>;

    /// Loads a window of entities ordered by creation time ascending.
    /// Returns an empty vector past the end.
    async fn scan(
        &self,
        entity_name: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EntityRecord>, DomainError>;

    /// Counts entities of a type.
    async fn count(&self, entity_name: &str) -> Result<u64, DomainError>;

    /// Returns whether the entity exists.
    async fn exists(&self, entity_name: &str, id: Uuid) -> Result<bool, DomainError>;

    /// Applies every mutation atomically: all of them or none.
    async fn persist(&self, mutations: &[Mutation]) -> Result<(), DomainError>;
}

/// Store handle shared across requests.
pub type SharedStore = Arc<dyn EntityStore>;
