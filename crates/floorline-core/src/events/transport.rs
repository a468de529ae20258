use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::events::EventEnvelope;

/// Where published envelopes go: the outbox table in production, an
/// in-memory dispatcher in tests and one-process deployments.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn publish(&self, envelope: EventEnvelope) -> Result<()>;

    /// Allows the transactional bus to detect outbox-capable transports.
    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()>;
}

/// Fans an envelope out to every registered handler. Handler failures are
/// logged and do not stop the remaining handlers; side effects are allowed
/// to fail independently of the transaction that produced them.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub async fn dispatch(&self, envelope: &EventEnvelope) {
        for handler in &self.handlers {
            if let Err(err) = handler.handle(envelope).await {
                tracing::error!(
                    handler = handler.name(),
                    event_type = %envelope.event_type,
                    event_id = %envelope.id,
                    error = %err,
                    "event handler failed"
                );
            }
        }
    }
}
