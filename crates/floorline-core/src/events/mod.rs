mod memory;
mod transport;
mod types;

pub use memory::MemoryTransport;
pub use transport::{EventDispatcher, EventHandler, EventTransport};
pub use types::{DomainEvent, EventEnvelope};
