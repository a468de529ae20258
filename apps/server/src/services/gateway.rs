use std::str::FromStr;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use floorline_commerce::services::{CheckoutSessionHandle, PaymentGateway, RefundHandle};
use floorline_commerce::{CommerceError, CommerceResult};
use floorline_core::money;

use crate::common::FloorlineSettings;

/// The only module that talks to Stripe. Everything upstream sees the
/// [`PaymentGateway`] trait and decimal dollars, not cents.
#[derive(Clone)]
pub struct StripeGateway {
    client: stripe::Client,
    frontend_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: &str, frontend_url: &str) -> Self {
        Self {
            client: stripe::Client::new(secret_key.to_string()),
            frontend_url: frontend_url.to_string(),
        }
    }

    pub fn from_settings(settings: &FloorlineSettings) -> Self {
        Self::new(&settings.stripe.secret_key, &settings.frontend_url)
    }

    /// Pre-authorisation for retail checkout. Returns (intent id, client
    /// secret for the storefront's payment element).
    pub async fn create_payment_intent(
        &self,
        amount: Decimal,
        email: &str,
    ) -> CommerceResult<(String, Option<String>)> {
        let cents = money::to_cents(amount);
        let mut params = stripe::CreatePaymentIntent::new(cents, stripe::Currency::USD);
        params.receipt_email = Some(email);
        params.automatic_payment_methods =
            Some(stripe::CreatePaymentIntentAutomaticPaymentMethods {
                enabled: true,
                allow_redirects: None,
            });
        let intent = stripe::PaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| CommerceError::Gateway(e.to_string()))?;
        Ok((intent.id.to_string(), intent.client_secret))
    }

    /// Grace expiry cancels the membership at the gateway.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> CommerceResult<()> {
        let id = stripe::SubscriptionId::from_str(subscription_id)
            .map_err(|e| CommerceError::Gateway(format!("bad subscription id: {e}")))?;
        stripe::Subscription::cancel(&self.client, &id, stripe::CancelSubscription::default())
            .await
            .map_err(|e| CommerceError::Gateway(e.to_string()))?;
        Ok(())
    }

    /// The checkout must verify the intent it is handed actually succeeded
    /// and for which amount.
    pub async fn retrieve_intent_amount(&self, intent_id: &str) -> CommerceResult<Decimal> {
        let id = stripe::PaymentIntentId::from_str(intent_id)
            .map_err(|e| CommerceError::Gateway(format!("bad payment intent id: {e}")))?;
        let intent = stripe::PaymentIntent::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| CommerceError::Gateway(e.to_string()))?;
        if intent.status != stripe::PaymentIntentStatus::Succeeded {
            return Err(CommerceError::Gateway(format!(
                "payment intent {intent_id} is {:?}, not succeeded",
                intent.status
            )));
        }
        Ok(money::from_cents(intent.amount))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Decimal,
    ) -> CommerceResult<RefundHandle> {
        let intent = stripe::PaymentIntentId::from_str(payment_intent_id)
            .map_err(|e| CommerceError::Gateway(format!("bad payment intent id: {e}")))?;
        let mut params = stripe::CreateRefund::new();
        params.payment_intent = Some(intent);
        params.amount = Some(money::to_cents(amount));
        let refund = stripe::Refund::create(&self.client, params)
            .await
            .map_err(|e| CommerceError::Gateway(e.to_string()))?;
        Ok(RefundHandle {
            refund_id: refund.id.to_string(),
        })
    }

    async fn create_checkout_session(
        &self,
        order_number: &str,
        email: &str,
        amount: Decimal,
        description: &str,
    ) -> CommerceResult<CheckoutSessionHandle> {
        let success_url = format!("{}/orders/{}?paid=1", self.frontend_url, order_number);
        let cancel_url = format!("{}/orders/{}", self.frontend_url, order_number);

        let params = stripe::CreateCheckoutSession {
            mode: Some(stripe::CheckoutSessionMode::Payment),
            customer_email: Some(email),
            success_url: Some(&success_url),
            cancel_url: Some(&cancel_url),
            expires_at: Some((Utc::now() + chrono::Duration::hours(24)).timestamp()),
            line_items: Some(vec![stripe::CreateCheckoutSessionLineItems {
                quantity: Some(1),
                price_data: Some(stripe::CreateCheckoutSessionLineItemsPriceData {
                    currency: stripe::Currency::USD,
                    unit_amount: Some(money::to_cents(amount)),
                    product_data: Some(
                        stripe::CreateCheckoutSessionLineItemsPriceDataProductData {
                            name: description.to_string(),
                            ..Default::default()
                        },
                    ),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let session = stripe::CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| CommerceError::Gateway(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| CommerceError::Gateway("checkout session has no URL".into()))?;
        let expires_at = Utc
            .timestamp_opt(session.expires_at, 0)
            .single()
            .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(24));
        Ok(CheckoutSessionHandle {
            session_id: session.id.to_string(),
            url,
            expires_at,
        })
    }
}

/// Verifies the webhook signature and parses the event.
pub fn parse_webhook(
    payload: &str,
    signature: &str,
    webhook_secret: &str,
) -> Result<stripe::Event, stripe::WebhookError> {
    stripe::Webhook::construct_event(payload, signature, webhook_secret)
}
