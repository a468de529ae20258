pub mod aggregate;
pub mod error;
pub mod fallback;
pub mod ltl;
pub mod parcel;
pub mod service;
pub mod types;

pub use error::{ShippingError, ShippingResult};
pub use ltl::{FreightViewClient, LtlRater, LtlRequest};
pub use parcel::{ParcelApiClient, ParcelRater};
pub use service::ShippingService;
pub use types::{RateOption, RateQuote, ShipmentLine, ShipmentMethod};
