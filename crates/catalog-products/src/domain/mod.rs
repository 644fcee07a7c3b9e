//! Product domain model, commands and queries.

pub mod commands;
pub mod product;
pub mod queries;
