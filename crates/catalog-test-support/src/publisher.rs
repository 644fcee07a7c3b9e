//! Test publishers — mock `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use catalog_core::error::DomainError;
use catalog_core::event::EntityEvent;
use catalog_core::publisher::{EventPublisher, MessageEnvelope};

/// A publisher that records every envelope it accepts and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<MessageEnvelope>>,
}

impl RecordingPublisher {
    /// Create an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every envelope published so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn envelopes(&self) -> Vec<MessageEnvelope> {
        self.published.lock().unwrap().clone()
    }

    /// Returns every published body decoded as an `EntityEvent`.
    ///
    /// # Panics
    ///
    /// Panics if a body is not an `EntityEvent` or the mutex is poisoned.
    pub fn entity_events(&self) -> Vec<EntityEvent> {
        self.envelopes()
            .iter()
            .map(|e| e.decode().expect("published body is an EntityEvent"))
            .collect()
    }

    /// Number of envelopes published so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, envelope: MessageEnvelope) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(envelope);
        Ok(())
    }
}

/// A publisher that accepts the first `accept` envelopes and fails every
/// later one with an infrastructure error.
#[derive(Debug, Default)]
pub struct FailingPublisher {
    accept: usize,
    inner: RecordingPublisher,
}

impl FailingPublisher {
    /// Create a publisher that fails from the first publish on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a publisher that accepts `accept` envelopes before failing.
    #[must_use]
    pub fn after(accept: usize) -> Self {
        Self {
            accept,
            inner: RecordingPublisher::new(),
        }
    }

    /// Returns the envelopes accepted before failures began.
    pub fn envelopes(&self) -> Vec<MessageEnvelope> {
        self.inner.envelopes()
    }
}

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, envelope: MessageEnvelope) -> Result<(), DomainError> {
        if self.inner.published_count() >= self.accept {
            return Err(DomainError::Infrastructure("broker unreachable".into()));
        }
        self.inner.publish(envelope).await
    }
}
