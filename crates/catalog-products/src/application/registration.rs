//! Binds the product handlers into a dispatcher registry.

use catalog_core::dispatch::HandlerRegistry;
use catalog_core::error::RegistryError;

use crate::application::command_handlers::{
    CreateProductHandler, DeleteProductHandler, UpdateProductHandler,
};
use crate::application::query_handlers::{GetAllProductsHandler, GetProductByIdHandler};
use crate::application::services::ProductServices;
use crate::domain::commands::{CreateProduct, DeleteProduct, UpdateProduct};
use crate::domain::queries::{GetAllProducts, GetProductById};

/// Registers one handler per product command and query.
///
/// # Errors
///
/// Returns `RegistryError::DuplicateHandler` if any product request type is
/// already bound in `registry`.
pub fn register_handlers(
    registry: &mut HandlerRegistry,
    services: &ProductServices,
) -> Result<(), RegistryError> {
    registry
        .register::<CreateProduct, _>(CreateProductHandler::new(services.clone()))?
        .register::<GetProductById, _>(GetProductByIdHandler::new(services.clone()))?
        .register::<GetAllProducts, _>(GetAllProductsHandler::new(services.clone()))?
        .register::<UpdateProduct, _>(UpdateProductHandler::new(services.clone()))?
        .register::<DeleteProduct, _>(DeleteProductHandler::new(services.clone()))?;
    Ok(())
}
