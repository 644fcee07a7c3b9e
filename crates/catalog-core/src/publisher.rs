//! Event publisher abstraction over a message broker.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DomainError;

/// Exchange that receives every entity event.
pub const ENTITY_EVENTS_EXCHANGE: &str = "entity-events-exchange";

/// Header carrying the entity event kind.
pub const EVENT_TYPE_HEADER: &str = "event-type";

/// How an exchange routes messages to bound queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Every bound queue receives every message; routing keys are ignored.
    Fanout,
    /// Queues receive messages whose routing key equals their binding key.
    Direct,
}

/// A message addressed to an exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    /// Target exchange.
    pub exchange: String,
    /// Routing mode expected of the exchange.
    pub kind: ExchangeKind,
    /// Routing key; empty for fanout.
    pub routing_key: String,
    /// String headers.
    pub headers: BTreeMap<String, String>,
    /// JSON message body.
    pub body: serde_json::Value,
}

impl MessageEnvelope {
    /// Builds a broadcast envelope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if `message` fails to serialize.
    pub fn fanout<T: Serialize>(exchange: &str, message: &T) -> Result<Self, DomainError> {
        Self::build(exchange, ExchangeKind::Fanout, String::new(), message)
    }

    /// Builds a routed envelope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if `message` fails to serialize.
    pub fn direct<T: Serialize>(
        exchange: &str,
        routing_key: &str,
        message: &T,
    ) -> Result<Self, DomainError> {
        Self::build(exchange, ExchangeKind::Direct, routing_key.to_owned(), message)
    }

    fn build<T: Serialize>(
        exchange: &str,
        kind: ExchangeKind,
        routing_key: String,
        message: &T,
    ) -> Result<Self, DomainError> {
        let body = serde_json::to_value(message).map_err(|e| {
            DomainError::Infrastructure(format!("message serialization failed: {e}"))
        })?;
        Ok(Self {
            exchange: exchange.to_owned(),
            kind,
            routing_key,
            headers: BTreeMap::new(),
            body,
        })
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Decodes the body.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the body is not a `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DomainError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("message from {} did not decode: {e}", self.exchange))
        })
    }
}

/// Fire-and-forget publishing to a named exchange.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Submits `envelope` to the broker. Returning `Ok` means the broker
    /// accepted it, not that any consumer processed it.
    async fn publish(&self, envelope: MessageEnvelope) -> Result<(), DomainError>;
}

/// Publisher handle shared across requests.
pub type SharedPublisher = Arc<dyn EventPublisher>;
