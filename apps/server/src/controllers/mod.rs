pub mod admin;
pub mod cart;
pub mod checkout;
pub mod customer;
pub mod health;
pub mod rep;
pub mod shipping;
pub mod trade;
pub mod webhooks;
