pub mod orders;
pub mod purchase_orders;
pub mod scraper;
pub mod staff;
