//! Catalog API — HTTP surface for the product catalog service.

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
