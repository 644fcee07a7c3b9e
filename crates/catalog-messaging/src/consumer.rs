//! Queue consumer worker.

use std::sync::Arc;

use catalog_core::error::DomainError;
use catalog_core::event::EntityEvent;
use catalog_core::publisher::{ENTITY_EVENTS_EXCHANGE, ExchangeKind};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broker::{InProcessBroker, QueueSubscription};
use crate::handler::MessageHandler;

/// Drains `subscription` into `handler` until `cancel` fires or the queue
/// closes. Returns the number of messages handled successfully.
///
/// Messages that fail to decode or that the handler rejects are logged and
/// dropped.
pub async fn run_consumer<M, H>(
    mut subscription: QueueSubscription,
    handler: Arc<H>,
    cancel: CancellationToken,
) -> usize
where
    M: DeserializeOwned + Send + 'static,
    H: MessageHandler<M> + ?Sized,
{
    let mut handled = 0usize;
    loop {
        let envelope = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = subscription.recv() => match next {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let message = match envelope.decode::<M>() {
            Ok(message) => message,
            Err(err) => {
                warn!(queue = subscription.queue(), error = %err, "dropping undecodable message");
                continue;
            }
        };

        match handler.handle(message).await {
            Ok(()) => handled += 1,
            Err(err) => {
                error!(queue = subscription.queue(), error = %err, "handler failed; message dropped");
            }
        }
    }

    info!(queue = subscription.queue(), handled, "consumer stopped");
    handled
}

/// Declares the entity-events exchange, binds `queue` to it, and spawns a
/// consumer feeding `handler`.
///
/// # Errors
///
/// Returns the broker's error if the exchange or binding cannot be set up.
pub fn spawn_entity_event_consumer<H>(
    broker: &InProcessBroker,
    queue: &str,
    handler: Arc<H>,
    cancel: CancellationToken,
) -> Result<JoinHandle<usize>, DomainError>
where
    H: MessageHandler<EntityEvent> + 'static,
{
    broker.declare_exchange(ENTITY_EVENTS_EXCHANGE, ExchangeKind::Fanout)?;
    let subscription = broker.bind_queue(ENTITY_EVENTS_EXCHANGE, queue, "")?;
    info!(queue, exchange = ENTITY_EVENTS_EXCHANGE, "entity event consumer started");
    Ok(tokio::spawn(run_consumer::<EntityEvent, H>(
        subscription,
        handler,
        cancel,
    )))
}
