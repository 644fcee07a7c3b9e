//! Queries for the Product context.

use catalog_core::dispatch::Request;
use uuid::Uuid;

use crate::application::query_handlers::{ProductPage, ProductView};

/// Query for one product.
#[derive(Debug, Clone, Copy)]
pub struct GetProductById {
    /// The product identifier.
    pub id: Uuid,
}

impl Request for GetProductById {
    type Response = Option<ProductView>;
}

/// Query for one page of products, oldest first. Page and size below 1 are
/// clamped to 1 and 10.
#[derive(Debug, Clone, Copy)]
pub struct GetAllProducts {
    /// 1-based page number.
    pub page_number: i64,
    /// Products per page.
    pub page_size: i64,
}

impl Request for GetAllProducts {
    type Response = ProductPage;
}
