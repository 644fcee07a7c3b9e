//! Router and dispatcher assembly shared by the binary and tests.

use axum::Router;
use catalog_core::dispatch::{Dispatcher, HandlerRegistry};
use catalog_core::error::RegistryError;
use catalog_products::application::registration::register_handlers;
use catalog_products::application::services::ProductServices;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

/// Registers every use case and freezes the registry.
///
/// # Errors
///
/// Returns `RegistryError::DuplicateHandler` if two handlers claim the same
/// request type.
pub fn build_dispatcher(services: &ProductServices) -> Result<Dispatcher, RegistryError> {
    let mut registry = HandlerRegistry::new();
    register_handlers(&mut registry, services)?;
    Ok(registry.into_dispatcher())
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .merge(routes::products::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
