//! Transactional commit with entity event derivation.
//!
//! `commit` publishes one [`EntityEvent`] per pending tracked entity and
//! only then persists the change set. There is no outbox: if the persist
//! step fails, or the caller cancels between the two steps, the events
//! already handed to the publisher stay published while the store is left
//! unchanged. Consumers must tolerate events for changes that never became
//! durable.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cancellation::cancellable;
use crate::clock::SharedClock;
use crate::entity::Entity;
use crate::error::DomainError;
use crate::event::EntityEvent;
use crate::publisher::{ENTITY_EVENTS_EXCHANGE, EVENT_TYPE_HEADER, MessageEnvelope, SharedPublisher};
use crate::repository::Repository;
use crate::store::{Mutation, SharedStore};
use crate::tracker::{self, ChangeTracker};

/// Commit boundary for one request.
///
/// Scoped to a single request; create one per operation and do not share it
/// between concurrent tasks.
pub struct UnitOfWork {
    store: SharedStore,
    publisher: SharedPublisher,
    clock: SharedClock,
    tracker: Arc<Mutex<ChangeTracker>>,
}

impl UnitOfWork {
    /// Opens a unit of work with an empty tracker.
    #[must_use]
    pub fn new(store: SharedStore, publisher: SharedPublisher, clock: SharedClock) -> Self {
        Self {
            store,
            publisher,
            clock,
            tracker: Arc::new(Mutex::new(ChangeTracker::new())),
        }
    }

    /// Returns a repository that stages into this unit of work.
    #[must_use]
    pub fn repository<E: Entity>(&self) -> Repository<E> {
        Repository::new(
            Arc::clone(&self.store),
            Arc::clone(&self.tracker),
            Arc::clone(&self.clock),
        )
    }

    /// Number of staged changes awaiting commit.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        tracker::lock(&self.tracker).pending_count()
    }

    /// Publishes one event per staged change, then persists every change
    /// atomically. Returns the published events in publish order.
    ///
    /// # Errors
    ///
    /// - The publisher's error if a publish fails; nothing is persisted and
    ///   earlier events in this commit stay published.
    /// - The store's error if the persist fails after all events were
    ///   published; the change set is not applied.
    /// - `DomainError::Cancelled` if `cancel` fires before a publish or
    ///   before the persist step starts; events already published stay
    ///   published. Cancellation during the persist is not observed.
    ///
    /// On any error the staged changes remain tracked.
    pub async fn commit(&self, cancel: &CancellationToken) -> Result<Vec<EntityEvent>, DomainError> {
        let pending = tracker::lock(&self.tracker).pending();
        if pending.is_empty() {
            debug!("nothing staged; commit is a no-op");
            return Ok(Vec::new());
        }

        let mut published = Vec::with_capacity(pending.len());
        for entry in &pending {
            let event = EntityEvent::from_entry(entry, self.clock.as_ref());
            let envelope = MessageEnvelope::fanout(ENTITY_EVENTS_EXCHANGE, &event)?
                .with_header(EVENT_TYPE_HEADER, event.event_type.as_str());

            if let Err(err) = cancellable(cancel, self.publisher.publish(envelope)).await {
                if !published.is_empty() {
                    warn!(
                        published = published.len(),
                        error = %err,
                        "commit aborted after entity events were published; they are not retracted"
                    );
                }
                return Err(err);
            }

            debug!(
                event_type = event.event_type.as_str(),
                entity_name = %event.entity_name,
                entity_id = %event.entity_id,
                "published entity event"
            );
            published.push(event);
        }

        let mutations: Vec<Mutation> = pending.iter().filter_map(|e| e.to_mutation()).collect();
        if cancel.is_cancelled() {
            warn!(
                published = published.len(),
                "commit cancelled after entity events were published; they are not retracted"
            );
            return Err(DomainError::Cancelled);
        }
        // Once started, persist runs to completion: dropping it mid-flight could
        // leave a durable write reported as cancelled.
        if let Err(err) = self.store.persist(&mutations).await {
            error!(
                published = published.len(),
                error = %err,
                "persist failed after entity events were published; store and event stream disagree"
            );
            return Err(err);
        }

        tracker::lock(&self.tracker).accept_changes();
        info!(changes = mutations.len(), "unit of work committed");
        Ok(published)
    }

    /// Abandons the unit of work, discarding staged changes. Nothing is
    /// published and events from an earlier failed commit are not
    /// compensated.
    pub fn rollback(self) {
        let mut guard = tracker::lock(&self.tracker);
        debug!(discarded = guard.pending_count(), "unit of work rolled back");
        guard.clear();
    }
}
