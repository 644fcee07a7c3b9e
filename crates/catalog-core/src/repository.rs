//! Generic repository over the entity store.
//!
//! A repository belongs to one unit of work. Reads go to the store (by-id
//! reads consult the unit of work's tracker first); mutations only stage
//! changes in the tracker and become durable on `UnitOfWork::commit`.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cancellation::cancellable;
use crate::clock::SharedClock;
use crate::entity::Entity;
use crate::error::DomainError;
use crate::store::{EntityRecord, SharedStore};
use crate::tracker::{self, ChangeTracker, EntryState};

/// Page number used when the caller asks for a page below 1.
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Page size used when the caller asks for a size below 1.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A clamped page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub number: u64,
    /// Entities per page.
    pub size: u64,
}

impl PageRequest {
    /// Clamps raw input: a page below 1 becomes 1, a size below 1 becomes 10.
    #[must_use]
    pub fn new(number: i64, size: i64) -> Self {
        Self {
            number: u64::try_from(number)
                .ok()
                .filter(|n| *n >= 1)
                .unwrap_or(DEFAULT_PAGE_NUMBER),
            size: u64::try_from(size)
                .ok()
                .filter(|s| *s >= 1)
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Number of entities before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

/// CRUD façade for one entity type within a unit of work.
pub struct Repository<E> {
    store: SharedStore,
    tracker: Arc<Mutex<ChangeTracker>>,
    clock: SharedClock,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub(crate) fn new(
        store: SharedStore,
        tracker: Arc<Mutex<ChangeTracker>>,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            tracker,
            clock,
            _entity: PhantomData,
        }
    }

    /// Loads an entity by id. A tracked copy wins over the store, and an
    /// entity staged for deletion reads as absent.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` fires, or the store's
    /// error if the read fails.
    pub async fn get_by_id(
        &self,
        id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Option<E>, DomainError> {
        let tracked = tracker::lock(&self.tracker)
            .get(E::ENTITY_NAME, id)
            .map(|entry| (entry.state, entry.record.clone()));
        if let Some((state, record)) = tracked {
            if state == EntryState::Deleted {
                return Ok(None);
            }
            return record.to_entity().map(Some);
        }

        let Some(record) = cancellable(cancel, self.store.find(E::ENTITY_NAME, id)).await? else {
            return Ok(None);
        };
        let entity = record.to_entity()?;
        tracker::lock(&self.tracker).attach(record);
        Ok(Some(entity))
    }

    /// Loads every entity of this type. Intended for small collections.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` fires, or the store's
    /// error if the read fails.
    pub async fn get_all(&self, cancel: &CancellationToken) -> Result<Vec<E>, DomainError> {
        let records = cancellable(cancel, self.store.list(E::ENTITY_NAME)).await?;
        records.iter().map(EntityRecord::to_entity::<E>).collect()
    }

    /// Loads one page ordered by creation time. Out-of-range page and size
    /// values are clamped; a page past the end is empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` fires, or the store's
    /// error if the read fails.
    pub async fn get_paged(
        &self,
        page_number: i64,
        page_size: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>, DomainError> {
        let page = PageRequest::new(page_number, page_size);
        let records = cancellable(
            cancel,
            self.store.scan(E::ENTITY_NAME, page.offset(), page.size),
        )
        .await?;
        records.iter().map(EntityRecord::to_entity::<E>).collect()
    }

    /// Stages an insertion.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the entity is already tracked.
    pub fn add(&self, entity: &E) -> Result<(), DomainError> {
        let record = EntityRecord::from_entity(entity)?;
        tracker::lock(&self.tracker).stage_add(record)
    }

    /// Stages several insertions. Stops at the first conflict; entities
    /// before it stay staged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if any entity is already tracked.
    pub fn add_range<'a, I>(&self, entities: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = &'a E>,
    {
        for entity in entities {
            self.add(entity)?;
        }
        Ok(())
    }

    /// Stamps the entity's update time and stages an overwrite.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the entity is staged for deletion.
    pub fn update(&self, entity: &mut E) -> Result<(), DomainError> {
        entity.mark_updated(self.clock.as_ref());
        let record = EntityRecord::from_entity(entity)?;
        tracker::lock(&self.tracker).stage_update(record)
    }

    /// Stages removal of the entity if it exists; does nothing otherwise.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` fires, or the store's
    /// error if the lookup fails.
    pub async fn delete(&self, id: Uuid, cancel: &CancellationToken) -> Result<(), DomainError> {
        if let Some(entity) = self.get_by_id(id, cancel).await? {
            let record = EntityRecord::from_entity(&entity)?;
            tracker::lock(&self.tracker).stage_delete(record);
        }
        Ok(())
    }

    /// Returns whether the entity exists, taking staged changes into
    /// account.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` fires, or the store's
    /// error if the read fails.
    pub async fn exists(&self, id: Uuid, cancel: &CancellationToken) -> Result<bool, DomainError> {
        let tracked = tracker::lock(&self.tracker)
            .get(E::ENTITY_NAME, id)
            .map(|entry| entry.state);
        match tracked {
            Some(state) => Ok(state != EntryState::Deleted),
            None => cancellable(cancel, self.store.exists(E::ENTITY_NAME, id)).await,
        }
    }

    /// Counts durable entities of this type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Cancelled` if `cancel` fires, or the store's
    /// error if the read fails.
    pub async fn count(&self, cancel: &CancellationToken) -> Result<u64, DomainError> {
        cancellable(cancel, self.store.count(E::ENTITY_NAME)).await
    }
}
