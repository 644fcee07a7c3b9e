//! Clock abstraction for entity timestamps and event capture times.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Abstraction over system time so timestamps are deterministic in tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock handle shared between handlers and units of work.
pub type SharedClock = Arc<dyn Clock>;

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
