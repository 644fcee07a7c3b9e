//! Collaborators shared by every product handler.

use std::sync::Arc;

use catalog_core::clock::SharedClock;
use catalog_core::publisher::SharedPublisher;
use catalog_core::store::SharedStore;
use catalog_core::unit_of_work::UnitOfWork;

/// Process-wide store, publisher and clock. Handlers open a fresh
/// `UnitOfWork` from these per request.
#[derive(Clone)]
pub struct ProductServices {
    /// Durable entity storage.
    pub store: SharedStore,
    /// Entity event sink.
    pub publisher: SharedPublisher,
    /// Time source for entity and event timestamps.
    pub clock: SharedClock,
}

impl ProductServices {
    /// Bundles the collaborators.
    #[must_use]
    pub fn new(store: SharedStore, publisher: SharedPublisher, clock: SharedClock) -> Self {
        Self {
            store,
            publisher,
            clock,
        }
    }

    /// Opens a unit of work scoped to one request.
    #[must_use]
    pub fn unit_of_work(&self) -> UnitOfWork {
        UnitOfWork::new(
            Arc::clone(&self.store),
            Arc::clone(&self.publisher),
            Arc::clone(&self.clock),
        )
    }
}
