//! Query handlers for the Product context.
//!
//! Queries never commit; they read through a throwaway unit of work.

use async_trait::async_trait;
use catalog_core::dispatch::Handler;
use catalog_core::entity::Entity;
use catalog_core::error::DomainError;
use catalog_core::repository::PageRequest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::services::ProductServices;
use crate::domain::product::Product;
use crate::domain::queries::{GetAllProducts, GetProductById};

/// Read-only view of a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    /// The product identifier.
    pub id: Uuid,
    /// Product name.
    pub name: String,
    /// Unit price.
    pub unit_price: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time, if any.
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id(),
            name: product.name().to_owned(),
            unit_price: product.unit_price(),
            created_at: product.meta().created_at(),
            updated_at: product.meta().updated_at(),
        }
    }
}

/// One page of products plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Products on this page, oldest first.
    pub items: Vec<ProductView>,
    /// 1-based page number after clamping.
    pub page_number: u64,
    /// Page size after clamping.
    pub page_size: u64,
    /// Number of products in the store.
    pub total_count: u64,
}

impl ProductPage {
    /// Number of pages needed to hold `total_count` products.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(self.page_size)
    }
}

/// Handles `GetProductById`.
pub struct GetProductByIdHandler {
    services: ProductServices,
}

impl GetProductByIdHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(services: ProductServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<GetProductById> for GetProductByIdHandler {
    #[instrument(skip(self, query, cancel), fields(product_id = %query.id))]
    async fn handle(
        &self,
        query: GetProductById,
        cancel: &CancellationToken,
    ) -> Result<Option<ProductView>, DomainError> {
        let uow = self.services.unit_of_work();
        let product = uow.repository::<Product>().get_by_id(query.id, cancel).await?;
        Ok(product.as_ref().map(ProductView::from))
    }
}

/// Handles `GetAllProducts`.
pub struct GetAllProductsHandler {
    services: ProductServices,
}

impl GetAllProductsHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(services: ProductServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Handler<GetAllProducts> for GetAllProductsHandler {
    #[instrument(skip(self, query, cancel), fields(page_number = query.page_number, page_size = query.page_size))]
    async fn handle(
        &self,
        query: GetAllProducts,
        cancel: &CancellationToken,
    ) -> Result<ProductPage, DomainError> {
        let page = PageRequest::new(query.page_number, query.page_size);
        let uow = self.services.unit_of_work();
        let repo = uow.repository::<Product>();

        let total_count = repo.count(cancel).await?;
        if total_count == 0 {
            debug!("no products stored; skipping page read");
            return Ok(ProductPage {
                items: Vec::new(),
                page_number: page.number,
                page_size: page.size,
                total_count,
            });
        }

        let products = repo
            .get_paged(query.page_number, query.page_size, cancel)
            .await?;
        Ok(ProductPage {
            items: products.iter().map(ProductView::from).collect(),
            page_number: page.number,
            page_size: page.size,
            total_count,
        })
    }
}
