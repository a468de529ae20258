pub mod dto;
pub mod entities;
pub mod error;
pub mod migration;
pub mod services;
pub mod types;

pub use error::{CommerceError, CommerceResult};
pub use services::{
    CartService, CommissionService, OrderService, PaymentService, PromoService,
    PurchaseOrderService, QuoteService,
};
