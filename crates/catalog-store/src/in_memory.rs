//! In-memory implementation of the `EntityStore` trait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use catalog_core::error::DomainError;
use catalog_core::store::{EntityRecord, EntityStore, Mutation};

type Partitions = HashMap<String, Vec<EntityRecord>>;

/// Process-local entity store. Rows of each entity type keep insertion
/// order, which breaks ties between equal creation timestamps when paging.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    partitions: Mutex<Partitions>,
}

impl InMemoryEntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn partitions(&self) -> MutexGuard<'_, Partitions> {
        self.partitions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply(rows: &mut Vec<EntityRecord>, mutation: &Mutation) -> Result<(), DomainError> {
    match mutation {
        Mutation::Insert(record) => {
            if rows.iter().any(|r| r.id == record.id) {
                return Err(DomainError::Conflict(format!(
                    "{} {} already exists",
                    record.entity_name, record.id
                )));
            }
            rows.push(record.clone());
        }
        Mutation::Update(record) => {
            let row = rows.iter_mut().find(|r| r.id == record.id).ok_or_else(|| {
                DomainError::Conflict(format!(
                    "{} {} does not exist",
                    record.entity_name, record.id
                ))
            })?;
            *row = record.clone();
        }
        Mutation::Delete { entity_name, id } => {
            let before = rows.len();
            rows.retain(|r| r.id != *id);
            if rows.len() == before {
                return Err(DomainError::Conflict(format!(
                    "{entity_name} {id} does not exist"
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find(&self, entity_name: &str, id: Uuid) -> Result<Option<EntityRecord>, DomainError> {
        Ok(self
            .partitions()
            .get(entity_name)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn list(&self, entity_name: &str) -> Result<Vec<EntityRecord>, DomainError> {
        Ok(self
            .partitions()
            .get(entity_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn scan(
        &self,
        entity_name: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EntityRecord>, DomainError> {
        let mut rows = self.list(entity_name).await?;
        rows.sort_by_key(|r| r.created_at);
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, entity_name: &str) -> Result<u64, DomainError> {
        let len = self.partitions().get(entity_name).map_or(0, Vec::len);
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }

    async fn exists(&self, entity_name: &str, id: Uuid) -> Result<bool, DomainError> {
        Ok(self
            .partitions()
            .get(entity_name)
            .is_some_and(|rows| rows.iter().any(|r| r.id == id)))
    }

    async fn persist(&self, mutations: &[Mutation]) -> Result<(), DomainError> {
        let mut partitions = self.partitions();
        // Only partitions the change set touches are copied; untouched ones
        // stay in place.
        let mut staged = Partitions::new();
        for mutation in mutations {
            let name = mutation.entity_name();
            let rows = staged
                .entry(name.to_owned())
                .or_insert_with(|| partitions.get(name).cloned().unwrap_or_default());
            apply(rows, mutation)?;
        }
        partitions.extend(staged);
        Ok(())
    }
}
