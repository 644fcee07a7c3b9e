//! Integration tests for `UnitOfWork::commit` and `rollback`.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_core::entity::Entity;
use catalog_core::error::DomainError;
use catalog_core::event::EntityEventKind;
use catalog_core::publisher::{
    ENTITY_EVENTS_EXCHANGE, EVENT_TYPE_HEADER, ExchangeKind, SharedPublisher,
};
use catalog_core::store::{EntityRecord, EntityStore, Mutation, SharedStore};
use catalog_core::unit_of_work::UnitOfWork;
use catalog_store::in_memory::InMemoryEntityStore;
use catalog_test_support::{FailingPersistStore, FailingPublisher, RecordingPublisher};
use common::{Harness, Note};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Records how many events the publisher had accepted when `persist` ran.
struct ObservingStore {
    inner: InMemoryEntityStore,
    publisher: Arc<RecordingPublisher>,
    seen_at_persist: Mutex<Option<usize>>,
}

#[async_trait]
impl EntityStore for ObservingStore {
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

    async fn persist(&self, mutations: &[Mutation]) -> Result<(), DomainError> {
        *self.seen_at_persist.lock().unwrap() = Some(self.publisher.published_count());
        self.inner.persist(mutations).await
    }
}

/// Holds `persist` open until released, signalling once it has started.
struct GatedStore {
    inner: InMemoryEntityStore,
    persist_started: Notify,
    release_persist: Notify,
}

#[async_trait]
impl EntityStore for GatedStore {
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

    async fn persist(&self, mutations: &[Mutation]) -> Result<(), DomainError> {
        self.persist_started.notify_one();
        self.release_persist.notified().await;
        self.inner.persist(mutations).await
    }
}

#[tokio::test]
async fn test_commit_publishes_one_created_event_per_added_entity() {
    // Arrange
    let harness = Harness::new();
    let uow = harness.unit_of_work();
    let repo = uow.repository::<Note>();
    let notes: Vec<Note> = (0..3)
        .map(|i| Note::new(&format!("note {i}"), harness.clock.as_ref()))
        .collect();
    repo.add_range(&notes).unwrap();

    // Act
    let events = uow.commit(&CancellationToken::new()).await.unwrap();

    // Assert
    assert_eq!(events.len(), 3);
    let recorded = harness.publisher.entity_events();
    assert_eq!(recorded.len(), 3);
    for (note, event) in notes.iter().zip(&recorded) {
        assert_eq!(event.event_type, EntityEventKind::Created);
        assert_eq!(event.entity_name, "Note");
        assert_eq!(event.entity_id, note.meta().id());
    }
    assert_eq!(harness.store.count("Note").await.unwrap(), 3);
    assert_eq!(uow.pending_changes(), 0);
}

#[tokio::test]
async fn test_commit_sends_fanout_envelopes_with_event_type_header() {
    // Arrange
    let harness = Harness::new();
    let uow = harness.unit_of_work();
    uow.repository::<Note>()
        .add(&Note::new("hello", harness.clock.as_ref()))
        .unwrap();

    // Act
    uow.commit(&CancellationToken::new()).await.unwrap();

    // Assert
    let envelopes = harness.publisher.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].exchange, ENTITY_EVENTS_EXCHANGE);
    assert_eq!(envelopes[0].kind, ExchangeKind::Fanout);
    assert_eq!(
        envelopes[0].headers.get(EVENT_TYPE_HEADER).map(String::as_str),
        Some("Created")
    );
}

#[tokio::test]
async fn test_every_event_is_published_before_persist_runs() {
    // Arrange
    let publisher = Arc::new(RecordingPublisher::new());
    let store = Arc::new(ObservingStore {
        inner: InMemoryEntityStore::new(),
        publisher: Arc::clone(&publisher),
        seen_at_persist: Mutex::new(None),
    });
    let harness = Harness::new();
    let shared_store: SharedStore = store.clone();
    let uow = UnitOfWork::new(shared_store, publisher.clone(), Arc::clone(&harness.clock));
    let repo = uow.repository::<Note>();
    for i in 0..4 {
        repo.add(&Note::new(&format!("n{i}"), harness.clock.as_ref()))
            .unwrap();
    }

    // Act
    uow.commit(&CancellationToken::new()).await.unwrap();

    // Assert
    assert_eq!(*store.seen_at_persist.lock().unwrap(), Some(4));
}

#[tokio::test]
async fn test_persist_failure_leaves_published_events_and_empty_store() {
    // Arrange
    let harness = Harness::new();
    let failing = Arc::new(FailingPersistStore::new(Arc::clone(&harness.store)));
    let shared_store: SharedStore = failing.clone();
    let uow = UnitOfWork::new(
        shared_store,
        harness.publisher.clone(),
        Arc::clone(&harness.clock),
    );
    let repo = uow.repository::<Note>();
    repo.add(&Note::new("a", harness.clock.as_ref())).unwrap();
    repo.add(&Note::new("b", harness.clock.as_ref())).unwrap();

    // Act
    let result = uow.commit(&CancellationToken::new()).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert_eq!(harness.publisher.published_count(), 2);
    assert_eq!(failing.persist_attempts(), 1);
    assert_eq!(harness.store.count("Note").await.unwrap(), 0);
    assert_eq!(uow.pending_changes(), 2);
}

#[tokio::test]
async fn test_publish_failure_aborts_before_persist() {
    // Arrange
    let harness = Harness::new();
    let publisher = Arc::new(FailingPublisher::after(1));
    let uow = UnitOfWork::new(
        Arc::clone(&harness.store),
        publisher.clone(),
        Arc::clone(&harness.clock),
    );
    let repo = uow.repository::<Note>();
    repo.add(&Note::new("a", harness.clock.as_ref())).unwrap();
    repo.add(&Note::new("b", harness.clock.as_ref())).unwrap();

    // Act
    let result = uow.commit(&CancellationToken::new()).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert_eq!(publisher.envelopes().len(), 1);
    assert_eq!(harness.store.count("Note").await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_and_delete_publish_matching_kinds() {
    // Arrange
    let harness = Harness::new();
    let mut first = Note::new("first", harness.clock.as_ref());
    let second = Note::new("second", harness.clock.as_ref());
    let seed = harness.unit_of_work();
    seed.repository::<Note>()
        .add_range([&first, &second])
        .unwrap();
    seed.commit(&CancellationToken::new()).await.unwrap();

    let uow = harness.unit_of_work();
    let repo = uow.repository::<Note>();
    let cancel = CancellationToken::new();
    first.text = "first, edited".into();

    // Act
    repo.update(&mut first).unwrap();
    repo.delete(second.meta().id(), &cancel).await.unwrap();
    let events = uow.commit(&cancel).await.unwrap();

    // Assert
    let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![EntityEventKind::Updated, EntityEventKind::Deleted]);
    assert_eq!(events[0].entity_id, first.meta().id());
    assert_eq!(events[1].entity_id, second.meta().id());
    assert!(first.meta().updated_at().is_some());

    let check = harness.unit_of_work().repository::<Note>();
    let stored = check.get_by_id(first.meta().id(), &cancel).await.unwrap().unwrap();
    assert_eq!(stored.text, "first, edited");
    assert!(!check.exists(second.meta().id(), &cancel).await.unwrap());
}

#[tokio::test]
async fn test_commit_with_nothing_staged_publishes_nothing() {
    // Arrange
    let harness = Harness::new();
    let uow = harness.unit_of_work();

    // Act
    let events = uow.commit(&CancellationToken::new()).await.unwrap();

    // Assert
    assert!(events.is_empty());
    assert_eq!(harness.publisher.published_count(), 0);
}

#[tokio::test]
async fn test_cancelled_commit_publishes_and_persists_nothing() {
    // Arrange
    let harness = Harness::new();
    let uow = harness.unit_of_work();
    uow.repository::<Note>()
        .add(&Note::new("late", harness.clock.as_ref()))
        .unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    // Act
    let result = uow.commit(&cancel).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Cancelled)));
    assert_eq!(harness.publisher.published_count(), 0);
    assert_eq!(harness.store.count("Note").await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancellation_during_persist_does_not_abandon_the_write() {
    // Arrange
    let harness = Harness::new();
    let store = Arc::new(GatedStore {
        inner: InMemoryEntityStore::new(),
        persist_started: Notify::new(),
        release_persist: Notify::new(),
    });
    let shared: SharedStore = store.clone();
    let publisher: SharedPublisher = harness.publisher.clone();
    let uow = UnitOfWork::new(shared, publisher, Arc::clone(&harness.clock));
    uow.repository::<Note>()
        .add(&Note::new("in flight", harness.clock.as_ref()))
        .unwrap();
    let cancel = CancellationToken::new();

    // Act
    let (result, ()) = tokio::join!(uow.commit(&cancel), async {
        store.persist_started.notified().await;
        cancel.cancel();
        store.release_persist.notify_one();
    });

    // Assert
    let events = result.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(store.inner.count("Note").await.unwrap(), 1);
    assert_eq!(uow.pending_changes(), 0);
}

#[tokio::test]
async fn test_rollback_discards_staged_changes() {
    // Arrange
    let harness = Harness::new();
    let uow = harness.unit_of_work();
    uow.repository::<Note>()
        .add(&Note::new("draft", harness.clock.as_ref()))
        .unwrap();
    assert_eq!(uow.pending_changes(), 1);

    // Act
    uow.rollback();

    // Assert
    assert_eq!(harness.publisher.published_count(), 0);
    assert_eq!(harness.store.count("Note").await.unwrap(), 0);
}
