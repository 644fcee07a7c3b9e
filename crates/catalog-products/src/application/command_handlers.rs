//! Command handlers for the Product context.
//!
//! Each handler opens its own unit of work, stages the change through the
//! product repository, and commits before returning success. Commit
//! publishes the entity events; see `catalog_core::unit_of_work`.

use async_trait::async_trait;
use catalog_core::dispatch::Handler;
use catalog_core::entity::Entity;
use catalog_core::error::DomainError;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::application::query_handlers::ProductView;
use crate::application::services::ProductServices;
use crate::domain::commands::{CreateProduct, DeleteProduct, UpdateProduct};
use crate::domain::product::Product;

/// Handles `CreateProduct`.
pub struct CreateProductHandler {
    services: ProductServices,
}

impl CreateProductHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(services: ProductServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<CreateProduct> for CreateProductHandler {
    #[instrument(skip(self, command, cancel), fields(name = %command.name))]
    async fn handle(
        &self,
        command: CreateProduct,
        cancel: &CancellationToken,
    ) -> Result<ProductView, DomainError> {
        let product = Product::new(
            &command.name,
            command.unit_price,
            self.services.clock.as_ref(),
        )?;

        let uow = self.services.unit_of_work();
        uow.repository::<Product>().add(&product)?;
        uow.commit(cancel).await?;

        info!(product_id = %product.id(), "product created");
        Ok(ProductView::from(&product))
    }
}

/// Handles `UpdateProduct`.
pub struct UpdateProductHandler {
    services: ProductServices,
}

impl UpdateProductHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(services: ProductServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<UpdateProduct> for UpdateProductHandler {
    #[instrument(skip(self, command, cancel), fields(product_id = %command.id))]
    async fn handle(
        &self,
        command: UpdateProduct,
        cancel: &CancellationToken,
    ) -> Result<Option<ProductView>, DomainError> {
        let uow = self.services.unit_of_work();
        let repo = uow.repository::<Product>();
        let Some(mut product) = repo.get_by_id(command.id, cancel).await? else {
            return Ok(None);
        };

        product.change_name(&command.name)?;
        product.change_unit_price(command.unit_price)?;
        repo.update(&mut product)?;
        uow.commit(cancel).await?;

        info!("product updated");
        Ok(Some(ProductView::from(&product)))
    }
}

/// Handles `DeleteProduct`.
pub struct DeleteProductHandler {
    services: ProductServices,
}

impl DeleteProductHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(services: ProductServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<DeleteProduct> for DeleteProductHandler {
    #[instrument(skip(self, command, cancel), fields(product_id = %command.id))]
    async fn handle(
        &self,
        command: DeleteProduct,
        cancel: &CancellationToken,
    ) -> Result<bool, DomainError> {
        let uow = self.services.unit_of_work();
        let repo = uow.repository::<Product>();
        if !repo.exists(command.id, cancel).await? {
            return Ok(false);
        }

        repo.delete(command.id, cancel).await?;
        uow.commit(cancel).await?;

        info!("product deleted");
        Ok(true)
    }
}
