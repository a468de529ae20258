pub mod error;
pub mod events;
pub mod id;
pub mod money;

pub use error::{Error, ErrorKind, Result};
pub use events::{
    DomainEvent, EventDispatcher, EventEnvelope, EventHandler, EventTransport, MemoryTransport,
};
pub use id::{generate_id, parse_id};

pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::events::{DomainEvent, EventEnvelope, EventHandler, EventTransport};
    pub use crate::id::generate_id;
    pub use uuid::Uuid;
}
