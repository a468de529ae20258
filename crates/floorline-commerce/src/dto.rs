//! Service inputs. Partial updates follow the per-field `Option<T>` pattern:
//! `None` means "leave unchanged".

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::{DeliveryMethod, OrderStatus, PriceTier, SellBy};

/// A rate the caller picked from the rater's options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingSelection {
    pub carrier: String,
    pub service: String,
    pub cost: Decimal,
    pub transit_days: Option<i32>,
    pub residential: bool,
    pub liftgate: bool,
    pub is_fallback: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryInput {
    pub method: DeliveryMethod,
    pub address: Option<serde_json::Value>,
    pub selection: Option<ShippingSelection>,
}

/// A fully resolved order line, ready for insertion.
#[derive(Clone, Debug)]
pub struct NewOrderItem {
    pub product_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub collection: Option<String>,
    pub description: Option<String>,
    pub num_boxes: i32,
    pub sqft_needed: Option<Decimal>,
    pub unit_price: Decimal,
    pub sell_by: SellBy,
    pub price_tier: Option<PriceTier>,
    pub is_sample: bool,
}

impl NewOrderItem {
    pub fn subtotal(&self) -> Decimal {
        floorline_core::money::floor_to_cents(self.unit_price * Decimal::from(self.num_boxes))
    }
}

#[derive(Clone, Debug, Validate)]
pub struct RetailCheckoutInput {
    #[validate(length(min = 1))]
    pub session_id: String,
    #[validate(email)]
    pub email: String,
    pub name: Option<String>,
    /// hash of the password when the buyer opted into an account
    pub account_password_hash: Option<String>,
    pub customer_id: Option<Uuid>,
    pub trade_customer_id: Option<Uuid>,
    pub delivery: DeliveryInput,
    pub promo_code: Option<String>,
    pub sample_shipping: Decimal,
    /// gateway intent pre-authorised against the computed total
    pub payment_intent_id: String,
    pub intent_amount: Decimal,
}

#[derive(Clone, Debug)]
pub struct TradeBulkItem {
    pub vendor_sku: String,
    pub num_boxes: i32,
    pub sqft_needed: Option<Decimal>,
}

#[derive(Clone, Debug)]
pub enum RepOrderPayment {
    /// collected outside the gateway; order confirms immediately
    Offline,
    /// gateway intent created up front; order stays pending
    Stripe { payment_intent_id: String },
}

#[derive(Clone, Debug)]
pub enum RepItemInput {
    Sku {
        vendor_sku: String,
        num_boxes: i32,
        sqft_needed: Option<Decimal>,
    },
    Custom {
        product_name: String,
        unit_price: Decimal,
        vendor_id: Uuid,
        num_boxes: i32,
        description: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct RepOrderInput {
    pub email: String,
    pub customer_id: Option<Uuid>,
    pub trade_customer_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub items: Vec<RepItemInput>,
    pub delivery: DeliveryInput,
    pub payment: RepOrderPayment,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: String,
    pub tracking_number: Option<String>,
    pub tracking_carrier: Option<String>,
    pub cancel_reason: Option<String>,
}

impl OrderStatusUpdate {
    pub fn target(&self) -> Result<OrderStatus, crate::error::CommerceError> {
        OrderStatus::parse(&self.status)
    }
}

/// Who performed a mutation, as recorded in activity logs.
#[derive(Clone, Debug)]
pub struct Actor {
    pub label: String,
    pub id: Option<Uuid>,
}

impl Actor {
    pub fn staff(id: Uuid) -> Self {
        Self {
            label: format!("staff:{id}"),
            id: Some(id),
        }
    }

    pub fn rep(id: Uuid) -> Self {
        Self {
            label: format!("rep:{id}"),
            id: Some(id),
        }
    }

    pub fn customer(email: &str) -> Self {
        Self {
            label: format!("customer:{email}"),
            id: None,
        }
    }

    pub fn system(what: &str) -> Self {
        Self {
            label: format!("system:{what}"),
            id: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewQuoteInput {
    pub email: String,
    pub customer_id: Option<Uuid>,
    pub trade_customer_id: Option<Uuid>,
    pub delivery: DeliveryInput,
    pub items: Vec<NewOrderItem>,
    pub promo_code: Option<String>,
    pub notes: Option<String>,
    pub expires_in_days: Option<i64>,
}

/// Per-field partial update of a draft quote.
#[derive(Clone, Debug, Default)]
pub struct QuoteUpdate {
    pub email: Option<String>,
    pub notes: Option<Option<String>>,
    pub expires_in_days: Option<i64>,
    /// full replacement of the line set when present
    pub items: Option<Vec<NewOrderItem>>,
}

/// An item the promo engine evaluates for eligibility.
#[derive(Clone, Debug)]
pub struct PromoItem {
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub is_sample: bool,
}

#[derive(Clone, Debug)]
pub struct PromoEvaluation {
    pub promo: crate::entities::promo_code::Model,
    pub discount_amount: Decimal,
    pub eligible_subtotal: Decimal,
}
