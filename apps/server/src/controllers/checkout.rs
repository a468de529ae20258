use axum::extract::State;
use loco_rs::prelude::*;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;

use floorline_commerce::dto::{DeliveryInput, PromoItem, RetailCheckoutInput};
use floorline_commerce::entities::{cart_item, product};
use floorline_commerce::types::DeliveryMethod;
use floorline_commerce::{OrderService, PromoService};
use floorline_core::money;

use crate::common::{api_error, FloorlineSettings};
use crate::services::{event_bus_from_context, StripeGateway};

#[derive(Deserialize)]
pub struct PromoValidateRequest {
    pub session_id: String,
    pub code: String,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct IntentRequest {
    pub session_id: String,
    pub email: String,
    pub promo_code: Option<String>,
    pub delivery: DeliveryInput,
    #[serde(default)]
    pub sample_shipping: Decimal,
}

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub session_id: String,
    pub email: String,
    pub name: Option<String>,
    /// set to opt into a storefront account
    pub password: Option<String>,
    pub promo_code: Option<String>,
    pub delivery: DeliveryInput,
    #[serde(default)]
    pub sample_shipping: Decimal,
    pub payment_intent_id: String,
}

async fn promo_items_for_cart(
    ctx: &AppContext,
    session_id: &str,
) -> Result<Vec<PromoItem>> {
    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::SessionId.eq(session_id))
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let category_id = match row.product_id {
            Some(id) => product::Entity::find_by_id(id)
                .one(&ctx.db)
                .await
                .map_err(|e| api_error(floorline_core::Error::from(e)))?
                .and_then(|p| p.category_id),
            None => None,
        };
        items.push(PromoItem {
            product_id: row.product_id,
            category_id,
            subtotal: money::floor_to_cents(row.unit_price * Decimal::from(row.num_boxes)),
            is_sample: row.is_sample,
        });
    }
    Ok(items)
}

async fn cart_subtotal(ctx: &AppContext, session_id: &str) -> Result<Decimal> {
    let items = promo_items_for_cart(ctx, session_id).await?;
    Ok(items
        .iter()
        .filter(|i| !i.is_sample)
        .map(|i| i.subtotal)
        .sum())
}

/// Dry-run promo validation for the storefront. Failures come back as
/// `{valid: false, error}` with a human-readable reason, not an error page.
#[utoipa::path(post, path = "/api/promo-codes/validate", tag = "checkout")]
async fn validate_promo(
    State(ctx): State<AppContext>,
    Json(body): Json<PromoValidateRequest>,
) -> Result<Response> {
    let items = promo_items_for_cart(&ctx, &body.session_id).await?;
    let promo = PromoService::new(ctx.db.clone());
    match promo
        .calculate_discount(&ctx.db, &body.code, &items, body.email.as_deref())
        .await
    {
        Ok(eval) => format::json(serde_json::json!({
            "valid": true,
            "code": eval.promo.code,
            "discount_amount": eval.discount_amount,
            "eligible_subtotal": eval.eligible_subtotal,
        })),
        Err(err) => format::json(serde_json::json!({
            "valid": false,
            "error": err.to_string(),
        })),
    }
}

/// Pre-authorises the computed total. The same math runs again at
/// place-order time inside the transaction.
#[utoipa::path(post, path = "/api/checkout/create-payment-intent", tag = "checkout")]
async fn create_payment_intent(
    State(ctx): State<AppContext>,
    Json(body): Json<IntentRequest>,
) -> Result<Response> {
    let subtotal = cart_subtotal(&ctx, &body.session_id).await?;
    if subtotal <= Decimal::ZERO && body.sample_shipping <= Decimal::ZERO {
        return Err(Error::BadRequest("cart is empty".into()));
    }

    let mut discount = Decimal::ZERO;
    if let Some(code) = &body.promo_code {
        let items = promo_items_for_cart(&ctx, &body.session_id).await?;
        let eval = PromoService::new(ctx.db.clone())
            .calculate_discount(&ctx.db, code, &items, Some(&body.email))
            .await
            .map_err(api_error)?;
        discount = eval.discount_amount;
    }

    let shipping = match body.delivery.method {
        DeliveryMethod::Pickup => Decimal::ZERO,
        DeliveryMethod::Shipping => body
            .delivery
            .selection
            .as_ref()
            .map(|s| s.cost)
            .ok_or_else(|| Error::BadRequest("a shipping rate must be selected".into()))?,
    };
    let total = subtotal + shipping + body.sample_shipping - discount;

    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let gateway = StripeGateway::from_settings(&settings);
    let (intent_id, client_secret) = gateway
        .create_payment_intent(total, &body.email)
        .await
        .map_err(api_error)?;

    format::json(serde_json::json!({
        "payment_intent_id": intent_id,
        "client_secret": client_secret,
        "amount": total,
    }))
}

/// Drains the cart into a confirmed order. Requires a succeeded payment
/// intent; the intent's amount is the race guard against a cart that
/// changed after pre-authorisation.
#[utoipa::path(post, path = "/api/checkout/place-order", tag = "checkout")]
async fn place_order(
    State(ctx): State<AppContext>,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<Response> {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let gateway = StripeGateway::from_settings(&settings);
    let intent_amount = gateway
        .retrieve_intent_amount(&body.payment_intent_id)
        .await
        .map_err(api_error)?;

    let account_password_hash = match &body.password {
        Some(password) => Some(
            floorline_auth::password::hash_password(password).map_err(api_error)?,
        ),
        None => None,
    };
    let wants_account = account_password_hash.is_some();

    let service = OrderService::new(ctx.db.clone(), event_bus_from_context(&ctx));
    let order = service
        .place_retail_order(RetailCheckoutInput {
            session_id: body.session_id,
            email: body.email.clone(),
            name: body.name,
            account_password_hash,
            customer_id: None,
            trade_customer_id: None,
            delivery: body.delivery,
            promo_code: body.promo_code,
            sample_shipping: body.sample_shipping,
            payment_intent_id: body.payment_intent_id,
            intent_amount,
        })
        .await
        .map_err(api_error)?;

    // account session is issued after the order commits; losing it only
    // costs the buyer a login, never the order
    let mut session_token = None;
    if wants_account {
        if let Some(customer_id) = order.customer_id {
            match floorline_auth::AuthService::new(ctx.db.clone())
                .issue_customer_session(customer_id)
                .await
            {
                Ok((token, _)) => session_token = Some(token),
                Err(err) => {
                    tracing::warn!(error = %err, "customer session not issued after checkout")
                }
            }
        }
    }

    format::json(serde_json::json!({
        "order": order,
        "customer_token": session_token,
    }))
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api")
        .add("/promo-codes/validate", post(validate_promo))
        .add("/checkout/create-payment-intent", post(create_payment_intent))
        .add("/checkout/place-order", post(place_order))
}
