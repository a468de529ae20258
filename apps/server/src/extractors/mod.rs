pub mod auth;

pub use auth::{
    CustomerAuth, OptionalCustomerAuth, OptionalTradeAuth, RepAuth, StaffAuth, TradeAuth,
};
