//! Test stores — `EntityStore` wrappers for failure and call-count scenarios.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use catalog_core::error::DomainError;
use catalog_core::store::{EntityRecord, EntityStore, Mutation};
use uuid::Uuid;

/// Delegates reads to an inner store and fails every `persist` with an
/// infrastructure error, counting the attempts.
pub struct FailingPersistStore {
    inner: Arc<dyn EntityStore>,
    attempts: AtomicUsize,
}

impl FailingPersistStore {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn EntityStore>) -> Self {
        Self {
            inner,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of `persist` calls received.
    pub fn persist_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for FailingPersistStore {
    async fn find(&self, entity_name: &str, id: Uuid) -> Result<Option<EntityRecord>, DomainError> {
        self.inner.find(entity_name, id).await
    }

    async fn list(&self, entity_name: &str) -> Result<Vec<EntityRecord>, DomainError> {
        self.inner.list(entity_name).await
    }

    async fn scan(
        &self,
        entity_name: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EntityRecord>, DomainError> {
        self.inner.scan(entity_name, offset, limit).await
    }

    async fn count(&self, entity_name: &str) -> Result<u64, DomainError> {
        self.inner.count(entity_name).await
    }

    async fn exists(&self, entity_name: &str, id: Uuid) -> Result<bool, DomainError> {
        self.inner.exists(entity_name, id).await
    }

    async fn persist(&self, _mutations: &[Mutation]) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Delegates everything to an inner store, counting `scan` calls.
pub struct ScanCountingStore {
    inner: Arc<dyn EntityStore>,
    scans: AtomicUsize,
}

impl ScanCountingStore {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn EntityStore>) -> Self {
        Self {
            inner,
            scans: AtomicUsize::new(0),
        }
    }

    /// Number of `scan` calls received.
    pub fn scan_calls(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for ScanCountingStore {
    async fn find(&self, entity_name: &str, id: Uuid) -> Result<Option<EntityRecord>, DomainError> {
        self.inner.find(entity_name, id).await
    }

    async fn list(&self, entity_name: &str) -> Result<Vec<EntityRecord>, DomainError> {
        self.inner.list(entity_name).await
    }

    async fn scan(
        &self,
        entity_name: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<EntityRecord>, DomainError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.scan(entity_name, offset, limit).await
    }

    async fn count(&self, entity_name: &str) -> Result<u64, DomainError> {
        self.inner.count(entity_name).await
    }

    async fn exists(&self, entity_name: &str, id: Uuid) -> Result<bool, DomainError> {
        self.inner.exists(entity_name, id).await
    }

    async fn persist(&self, mutations: &[Mutation]) -> Result<(), DomainError> {
        self.inner.persist(mutations).await
    }
}
