//! Shared application state.

use std::sync::Arc;

use catalog_core::dispatch::Dispatcher;
use tokio_util::sync::CancellationToken;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Routes product commands and queries to their handlers.
    pub dispatcher: Arc<Dispatcher>,
    /// Root token, cancelled when the server shuts down.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) -> Self {
        Self {
            dispatcher,
            shutdown,
        }
    }

    /// Token for one request; cancelled with the server.
    #[must_use]
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
