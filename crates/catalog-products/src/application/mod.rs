//! Product use-case handlers.

pub mod command_handlers;
pub mod query_handlers;
pub mod registration;
pub mod services;
