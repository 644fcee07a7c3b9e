//! Catalog Core — shared domain abstractions.
//!
//! This crate defines the entity base, the domain event, request dispatch,
//! and the change-tracking repository and unit of work that every use case
//! composes. Storage engines and message transports live in other crates
//! behind the [`store::EntityStore`] and [`publisher::EventPublisher`] traits.

pub mod cancellation;
pub mod clock;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod event;
pub mod publisher;
pub mod repository;
pub mod store;
pub mod tracker;
pub mod unit_of_work;
