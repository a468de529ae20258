//! Mock event transport that records published envelopes for assertions.

use floorline_core::events::{DomainEvent, EventEnvelope, EventTransport};
use floorline_outbox::TransactionalEventBus;
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct MockEventTransport {
    recorded: Arc<Mutex<Vec<EventEnvelope>>>,
}

#[async_trait::async_trait]
impl EventTransport for MockEventTransport {
    async fn publish(&self, envelope: EventEnvelope) -> floorline_core::Result<()> {
        self.recorded.lock().unwrap().push(envelope);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl MockEventTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    pub fn has_event_of_type(&self, event_type: &str) -> bool {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.event_type == event_type)
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<DomainEvent> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .map(|e| e.event.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.recorded.lock().unwrap().clear();
    }
}

/// A `TransactionalEventBus` that records events without a real outbox.
/// Events "publish" immediately; tests assert against the transport.
pub fn mock_transactional_event_bus() -> (TransactionalEventBus, Arc<MockEventTransport>) {
    let transport = Arc::new(MockEventTransport::new());
    (
        TransactionalEventBus::new(transport.clone()),
        transport,
    )
}
