//! Shared test doubles and utilities for the product catalog service.

mod clock;
mod publisher;
mod store;

pub use clock::{FixedClock, SteppingClock};
pub use publisher::{FailingPublisher, RecordingPublisher};
pub use store::{FailingPersistStore, ScanCountingStore};
