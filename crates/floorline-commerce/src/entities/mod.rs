pub mod cart_item;
pub mod customer;
pub mod edi_transaction;
pub mod inventory_snapshot;
pub mod order;
pub mod order_activity_log;
pub mod order_item;
pub mod order_payment;
pub mod order_price_adjustment;
pub mod payment_request;
pub mod po_activity_log;
pub mod product;
pub mod promo_code;
pub mod promo_code_usage;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod quote;
pub mod quote_item;
pub mod rep_commission;
pub mod sales_rep;
pub mod sku;
pub mod stock_alert;
pub mod trade_customer;
pub mod trade_document;
pub mod trade_tier;
pub mod vendor;
