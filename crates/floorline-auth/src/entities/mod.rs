pub mod customer_session;
pub mod rep_session;
pub mod staff_session;
pub mod staff_user;
pub mod trade_session;
pub mod trusted_device;
pub mod two_factor_code;
