//! Commands for the Product context.

use catalog_core::dispatch::Request;
use uuid::Uuid;

use crate::application::query_handlers::ProductView;

/// Command to create a product.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    /// Product name.
    pub name: String,
    /// Unit price.
    pub unit_price: f64,
}

impl Request for CreateProduct {
    type Response = ProductView;
}

/// Command to replace a product's name and price.
#[derive(Debug, Clone)]
pub struct UpdateProduct {
    /// The product identifier.
    pub id: Uuid,
    /// New name.
    pub name: String,
    /// New unit price.
    pub unit_price: f64,
}

/// `None` when the product does not exist.
impl Request for UpdateProduct {
    type Response = Option<ProductView>;
}

/// Command to delete a product.
#[derive(Debug, Clone, Copy)]
pub struct DeleteProduct {
    /// The product identifier.
    pub id: Uuid,
}

/// `false` when the product does not exist.
impl Request for DeleteProduct {
    type Response = bool;
}
