//! In-process exchange broker.
//!
//! Exchanges must be declared before queues bind to them or messages are
//! published to them. Delivery is best-effort: a queue whose subscription
//! was dropped is unbound on the next publish that reaches it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use catalog_core::error::DomainError;
use catalog_core::publisher::{EventPublisher, ExchangeKind, MessageEnvelope};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receiving end of a queue bound to an exchange.
#[derive(Debug)]
pub struct QueueSubscription {
    queue: String,
    receiver: mpsc::UnboundedReceiver<MessageEnvelope>,
}

impl QueueSubscription {
    /// Returns the queue name.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Waits for the next message. Returns `None` once the broker is gone.
    pub async fn recv(&mut self) -> Option<MessageEnvelope> {
        self.receiver.recv().await
    }
}

#[derive(Debug)]
struct QueueBinding {
    queue: String,
    binding_key: String,
    sender: mpsc::UnboundedSender<MessageEnvelope>,
}

impl QueueBinding {
    fn accepts(&self, kind: ExchangeKind, routing_key: &str) -> bool {
        match kind {
            ExchangeKind::Fanout => true,
            ExchangeKind::Direct => self.binding_key == routing_key,
        }
    }
}

#[derive(Debug)]
struct Exchange {
    kind: ExchangeKind,
    bindings: Vec<QueueBinding>,
}

/// Exchange/queue broker living in this process.
#[derive(Debug, Default)]
pub struct InProcessBroker {
    exchanges: Mutex<HashMap<String, Exchange>>,
}

impl InProcessBroker {
    /// Creates a broker with no exchanges.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn exchanges(&self) -> MutexGuard<'_, HashMap<String, Exchange>> {
        self.exchanges.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declares an exchange. Redeclaring with the same kind is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Conflict` if the exchange exists with another
    /// kind.
    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind) -> Result<(), DomainError> {
        let mut exchanges = self.exchanges();
        if let Some(existing) = exchanges.get(name) {
            if existing.kind != kind {
                return Err(DomainError::Conflict(format!(
                    "exchange {name} already declared as {:?}",
                    existing.kind
                )));
            }
            return Ok(());
        }
        exchanges.insert(
            name.to_owned(),
            Exchange {
                kind,
                bindings: Vec::new(),
            },
        );
        debug!(exchange = name, ?kind, "exchange declared");
        Ok(())
    }

    /// Binds a new queue to `exchange`. Fanout exchanges ignore
    /// `binding_key`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the exchange was never
    /// declared.
    pub fn bind_queue(
        &self,
        exchange: &str,
        queue: &str,
        binding_key: &str,
    ) -> Result<QueueSubscription, DomainError> {
        let mut exchanges = self.exchanges();
        let target = exchanges
            .get_mut(exchange)
            .ok_or_else(|| undeclared(exchange))?;
        let (sender, receiver) = mpsc::unbounded_channel();
        target.bindings.push(QueueBinding {
            queue: queue.to_owned(),
            binding_key: binding_key.to_owned(),
            sender,
        });
        debug!(exchange, queue, binding_key, "queue bound");
        Ok(QueueSubscription {
            queue: queue.to_owned(),
            receiver,
        })
    }

    /// Number of live queue bindings on `exchange`.
    #[must_use]
    pub fn binding_count(&self, exchange: &str) -> usize {
        self.exchanges()
            .get(exchange)
            .map_or(0, |e| e.bindings.len())
    }
}

fn undeclared(exchange: &str) -> DomainError {
    DomainError::Infrastructure(format!("exchange {exchange} is not declared"))
}

#[async_trait]
impl EventPublisher for InProcessBroker {
    async fn publish(&self, envelope: MessageEnvelope) -> Result<(), DomainError> {
        let mut exchanges = self.exchanges();
        let exchange = exchanges
            .get_mut(&envelope.exchange)
            .ok_or_else(|| undeclared(&envelope.exchange))?;
        if exchange.kind != envelope.kind {
            return Err(DomainError::Infrastructure(format!(
                "exchange {} is {:?}, message addressed as {:?}",
                envelope.exchange, exchange.kind, envelope.kind
            )));
        }

        let kind = exchange.kind;
        let mut delivered = 0usize;
        exchange.bindings.retain(|binding| {
            if !binding.accepts(kind, &envelope.routing_key) {
                return true;
            }
            if binding.sender.send(envelope.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                warn!(queue = %binding.queue, "dropping binding for closed queue");
                false
            }
        });

        if delivered == 0 {
            debug!(exchange = %envelope.exchange, "message had no matching queue");
        }
        Ok(())
    }
}
