//! Shared fixtures for catalog-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use catalog_core::clock::{Clock, SharedClock};
use catalog_core::entity::{Entity, EntityMeta};
use catalog_core::publisher::SharedPublisher;
use catalog_core::store::SharedStore;
use catalog_core::unit_of_work::UnitOfWork;
use catalog_store::in_memory::InMemoryEntityStore;
use catalog_test_support::{RecordingPublisher, SteppingClock};
use chrono::{Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Minimal entity used to exercise the generic machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(flatten)]
    meta: EntityMeta,
    pub text: String,
}

impl Note {
    pub fn new(text: &str, clock: &dyn Clock) -> Self {
        Self {
            meta: EntityMeta::new(clock),
            text: text.to_owned(),
        }
    }
}

impl Entity for Note {
    const ENTITY_NAME: &'static str = "Note";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

pub struct Harness {
    pub store: SharedStore,
    pub publisher: Arc<RecordingPublisher>,
    pub clock: SharedClock,
}

impl Harness {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Self {
            store: Arc::new(InMemoryEntityStore::new()),
            publisher: Arc::new(RecordingPublisher::new()),
            clock: Arc::new(SteppingClock::new(start, Duration::seconds(1))),
        }
    }

    pub fn unit_of_work(&self) -> UnitOfWork {
        let publisher: SharedPublisher = self.publisher.clone();
        UnitOfWork::new(
            Arc::clone(&self.store),
            publisher,
            Arc::clone(&self.clock),
        )
    }
}
