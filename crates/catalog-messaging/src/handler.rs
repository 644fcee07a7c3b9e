//! Message handlers invoked by the consumer worker.

use async_trait::async_trait;
use catalog_core::error::DomainError;
use catalog_core::event::EntityEvent;
use tracing::info;

/// Processes one decoded message.
///
/// Returning an error signals that the message was not handled. The
/// consumer logs it and moves on; there is no redelivery.
#[async_trait]
pub trait MessageHandler<M>: Send + Sync {
    async fn handle(&self, message: M) -> Result<(), DomainError>;
}

/// Logs every entity event it receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEntityEventHandler;

#[async_trait]
impl MessageHandler<EntityEvent> for LoggingEntityEventHandler {
    async fn handle(&self, event: EntityEvent) -> Result<(), DomainError> {
        info!(
            event_type = event.event_type.as_str(),
            entity_name = %event.entity_name,
            entity_id = %event.entity_id,
            timestamp = %event.timestamp,
            "event received"
        );
        Ok(())
    }
}
