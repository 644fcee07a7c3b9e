//! Catalog Store — `EntityStore` implementations.
//!
//! [`in_memory::InMemoryEntityStore`] backs development runs and tests;
//! [`pg_entity_store::PgEntityStore`] keeps entity snapshots in PostgreSQL.

pub mod in_memory;
pub mod pg_entity_store;
pub mod schema;
