//! Catalog Messaging — broker and consumer plumbing for entity events.
//!
//! [`broker::InProcessBroker`] implements `EventPublisher` with
//! exchange/queue semantics; [`consumer::run_consumer`] drains a bound
//! queue into a [`handler::MessageHandler`].

pub mod broker;
pub mod consumer;
pub mod handler;
