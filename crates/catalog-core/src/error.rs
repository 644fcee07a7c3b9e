//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// "Not found" is deliberately absent: lookups return `Option` and the
/// boundary decides how to surface a miss.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An entity constructor or mutator rejected its input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A staged mutation or store write contradicts the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller abandoned the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// An infrastructure/persistence/messaging error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

/// Startup-time handler registration fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A second handler was registered for the same request type.
    #[error("a handler is already registered for {request}")]
    DuplicateHandler {
        /// Type name of the request.
        request: &'static str,
    },
}

/// Failure of a dispatched request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is bound to the request's type. Always a wiring bug.
    #[error("handler not found for {request}")]
    HandlerNotFound {
        /// Type name of the request.
        request: &'static str,
    },

    /// The route cached for a request type holds a binding for another
    /// type. Routes are keyed by the type they bind, so this is unreachable
    /// unless the registry is corrupted.
    #[error("handler binding for {request} has the wrong type")]
    BindingMismatch {
        /// Type name of the request.
        request: &'static str,
    },

    /// The bound handler ran and failed.
    #[error(transparent)]
    Handler(#[from] DomainError),
}
