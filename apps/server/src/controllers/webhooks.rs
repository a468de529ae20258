use axum::extract::State;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use loco_rs::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use floorline_commerce::entities::trade_customer;
use floorline_commerce::PaymentService;
use floorline_email::EmailService;

use crate::common::{api_error, FloorlineSettings};
use crate::services::{event_bus_from_context, gateway};

const GRACE_EXTENSION_DAYS: i64 = 30;

fn email_service(settings: &FloorlineSettings) -> EmailService {
    match (&settings.email.enabled, &settings.email.smtp) {
        (true, Some(smtp)) => EmailService::smtp(smtp).unwrap_or(EmailService::Disabled),
        _ => EmailService::disabled(),
    }
}

async fn trade_by_subscription(
    ctx: &AppContext,
    subscription_id: &str,
) -> Result<Option<trade_customer::Model>> {
    trade_customer::Entity::find()
        .filter(trade_customer::Column::StripeSubscriptionId.eq(subscription_id))
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))
}

fn subscription_id_of(invoice: &stripe::Invoice) -> Option<String> {
    match &invoice.subscription {
        Some(stripe::Expandable::Id(id)) => Some(id.to_string()),
        Some(stripe::Expandable::Object(subscription)) => Some(subscription.id.to_string()),
        None => None,
    }
}

/// Payment-gateway event ingestion. Signature-checked; unknown event types
/// are acknowledged and ignored.
#[utoipa::path(post, path = "/api/webhooks/stripe", tag = "webhooks")]
async fn stripe_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: String,
) -> Result<Response> {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::BadRequest("missing stripe-signature header".into()))?;

    let event = gateway::parse_webhook(&body, signature, &settings.stripe.webhook_secret)
        .map_err(|e| Error::BadRequest(format!("webhook verification failed: {e}")))?;

    let payments = PaymentService::new(ctx.db.clone(), event_bus_from_context(&ctx));
    let email = email_service(&settings);

    match event.type_ {
        stripe::EventType::CheckoutSessionCompleted => {
            if let stripe::EventObject::CheckoutSession(session) = event.data.object {
                payments
                    .complete_checkout_session(session.id.as_str())
                    .await
                    .map_err(api_error)?;
            }
        }
        stripe::EventType::CheckoutSessionExpired => {
            if let stripe::EventObject::CheckoutSession(session) = event.data.object {
                payments
                    .expire_checkout_session(session.id.as_str())
                    .await
                    .map_err(api_error)?;
            }
        }
        stripe::EventType::InvoicePaid => {
            if let stripe::EventObject::Invoice(invoice) = event.data.object {
                if let Some(subscription_id) = subscription_id_of(&invoice) {
                    if let Some(trade) = trade_by_subscription(&ctx, &subscription_id).await? {
                        let expires = trade
                            .subscription_expires_at
                            .filter(|at| *at > Utc::now())
                            .unwrap_or_else(Utc::now)
                            + Duration::days(GRACE_EXTENSION_DAYS);
                        let mut active: trade_customer::ActiveModel = trade.into();
                        active.subscription_status = Set(Some("active".to_string()));
                        active.subscription_expires_at = Set(Some(expires));
                        active.updated_at = Set(Utc::now());
                        active
                            .update(&ctx.db)
                            .await
                            .map_err(|e| api_error(floorline_core::Error::from(e)))?;
                    }
                }
            }
        }
        stripe::EventType::InvoicePaymentFailed => {
            if let stripe::EventObject::Invoice(invoice) = event.data.object {
                if let Some(subscription_id) = subscription_id_of(&invoice) {
                    if let Some(trade) = trade_by_subscription(&ctx, &subscription_id).await? {
                        let recipient = trade.email.clone();
                        let mut active: trade_customer::ActiveModel = trade.into();
                        active.subscription_status = Set(Some("past_due".to_string()));
                        active.updated_at = Set(Utc::now());
                        active
                            .update(&ctx.db)
                            .await
                            .map_err(|e| api_error(floorline_core::Error::from(e)))?;
                        if let Err(err) = email
                            .subscription_lapse_warning(&recipient, GRACE_EXTENSION_DAYS)
                            .await
                        {
                            tracing::warn!(error = %err, "lapse warning email failed");
                        }
                    }
                }
            }
        }
        stripe::EventType::CustomerSubscriptionDeleted => {
            if let stripe::EventObject::Subscription(subscription) = event.data.object {
                if let Some(trade) =
                    trade_by_subscription(&ctx, subscription.id.as_str()).await?
                {
                    let mut active: trade_customer::ActiveModel = trade.into();
                    active.subscription_status = Set(Some("cancelled".to_string()));
                    active.updated_at = Set(Utc::now());
                    active
                        .update(&ctx.db)
                        .await
                        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
                }
            }
        }
        other => {
            tracing::debug!(event_type = %other, "ignoring unhandled stripe event");
        }
    }

    format::json(serde_json::json!({"received": true}))
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/webhooks")
        .add("/stripe", post(stripe_webhook))
}
