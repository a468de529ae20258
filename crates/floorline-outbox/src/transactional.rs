use crate::transport::OutboxTransport;
use floorline_core::events::{DomainEvent, EventEnvelope, EventTransport};
use floorline_core::Result;
use sea_orm::ConnectionTrait;
use std::sync::Arc;
use uuid::Uuid;

/// Publishes domain events so they become visible only if the surrounding
/// transaction commits. Falls back to direct publish for transports without
/// outbox support (tests, memory transport).
#[derive(Clone)]
pub struct TransactionalEventBus {
    transport: Arc<dyn EventTransport>,
}

impl TransactionalEventBus {
    pub fn new(transport: Arc<dyn EventTransport>) -> Self {
        Self { transport }
    }

    pub async fn publish_in_tx<C>(
        &self,
        txn: &C,
        actor_id: Option<Uuid>,
        event: DomainEvent,
    ) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let envelope = self.envelope(actor_id, event)?;

        if let Some(outbox) = self.transport.as_any().downcast_ref::<OutboxTransport>() {
            outbox.write_to_outbox(txn, envelope).await?;
        } else {
            tracing::warn!(
                "EventTransport doesn't support transactional writes. \
                 Event may be lost if transaction fails."
            );
            self.transport.publish(envelope).await?;
        }

        Ok(())
    }

    pub async fn publish(&self, actor_id: Option<Uuid>, event: DomainEvent) -> Result<()> {
        let envelope = self.envelope(actor_id, event)?;
        self.transport.publish(envelope).await
    }

    fn envelope(&self, actor_id: Option<Uuid>, event: DomainEvent) -> Result<EventEnvelope> {
        event.validate().map_err(|e| {
            tracing::error!(
                event_type = event.event_type(),
                error = %e,
                "Event validation failed"
            );
            floorline_core::Error::Validation(format!("Event validation failed: {e}"))
        })?;
        Ok(EventEnvelope::new(actor_id, event))
    }
}
