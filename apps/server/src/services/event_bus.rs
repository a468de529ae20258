use std::sync::Arc;

use loco_rs::app::AppContext;

use floorline_core::events::{EventDispatcher, MemoryTransport};
use floorline_outbox::{OutboxRelay, OutboxTransport, TransactionalEventBus};

/// Shared event plumbing, built once at boot and stashed in the loco
/// shared store.
#[derive(Clone)]
pub struct EventRuntime {
    pub transport: Arc<OutboxTransport>,
    pub dispatcher: Arc<EventDispatcher>,
}

impl EventRuntime {
    pub fn new(ctx: &AppContext, dispatcher: EventDispatcher) -> Self {
        Self {
            transport: Arc::new(OutboxTransport::new(ctx.db.clone())),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// The relay drains the outbox after commit and hands envelopes to the
    /// in-process dispatcher through a memory transport.
    pub fn relay(&self, ctx: &AppContext) -> OutboxRelay {
        let target = Arc::new(MemoryTransport::new(self.dispatcher.clone()));
        OutboxRelay::new(ctx.db.clone(), target)
    }
}

/// Services publish through the outbox transport so events become visible
/// only when the owning transaction commits.
pub fn event_bus_from_context(ctx: &AppContext) -> TransactionalEventBus {
    let transport = ctx
        .shared_store
        .get::<EventRuntime>()
        .map(|runtime| runtime.transport.clone())
        .unwrap_or_else(|| Arc::new(OutboxTransport::new(ctx.db.clone())));
    TransactionalEventBus::new(transport)
}
