//! Catalog Products — the Product bounded context.
//!
//! Holds the `Product` entity, the commands and queries that act on it, and
//! the handlers that compose the generic repository and unit of work into
//! the five product use cases.

pub mod application;
pub mod domain;
