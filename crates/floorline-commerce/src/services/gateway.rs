use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::CommerceResult;

#[derive(Clone, Debug)]
pub struct RefundHandle {
    pub refund_id: String,
}

#[derive(Clone, Debug)]
pub struct CheckoutSessionHandle {
    pub session_id: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// The slice of the payment gateway the commerce spine consumes. The
/// production implementation wraps Stripe; tests record calls.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Refund against the original payment intent. Amount is positive.
    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Decimal,
    ) -> CommerceResult<RefundHandle>;

    /// Hosted checkout link for an outstanding balance.
    async fn create_checkout_session(
        &self,
        order_number: &str,
        email: &str,
        amount: Decimal,
        description: &str,
    ) -> CommerceResult<CheckoutSessionHandle>;
}
