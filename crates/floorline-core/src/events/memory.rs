use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::events::{EventDispatcher, EventEnvelope, EventTransport};

/// Dispatches inline on publish. No durability; events published inside a
/// transaction that later rolls back will still have been handled.
pub struct MemoryTransport {
    dispatcher: Arc<EventDispatcher>,
}

impl MemoryTransport {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl EventTransport for MemoryTransport {
    async fn publish(&self, envelope: EventEnvelope) -> Result<()> {
        self.dispatcher.dispatch(&envelope).await;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
