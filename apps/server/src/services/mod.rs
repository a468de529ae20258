pub mod dispatch;
pub mod event_bus;
pub mod gateway;
pub mod handlers;

pub use dispatch::{PdfRenderer, PoDispatcher, RawHtmlRenderer};
pub use event_bus::{event_bus_from_context, EventRuntime};
pub use gateway::StripeGateway;
