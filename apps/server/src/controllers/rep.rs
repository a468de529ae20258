use axum::extract::{Path, State};
use loco_rs::prelude::*;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use floorline_auth::{password, AuthService};
use floorline_commerce::dto::{
    Actor, DeliveryInput, NewOrderItem, NewQuoteInput, QuoteUpdate, RepItemInput, RepOrderInput,
    RepOrderPayment,
};
use floorline_commerce::entities::{order, sales_rep};
use floorline_commerce::types::SellBy;
use floorline_commerce::{CommissionService, OrderService, QuoteService};

use crate::common::api_error;
use crate::extractors::RepAuth;
use crate::services::event_bus_from_context;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemInput {
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

impl From<ItemInput> for RepItemInput {
    fn from(value: ItemInput) -> Self {
        match value {
            ItemInput::Sku {
                vendor_sku,
                num_boxes,
                sqft_needed,
            } => RepItemInput::Sku {
                vendor_sku,
                num_boxes,
                sqft_needed,
            },
            ItemInput::Custom {
                product_name,
                unit_price,
                vendor_id,
                num_boxes,
                description,
            } => RepItemInput::Custom {
                product_name,
                unit_price,
                vendor_id,
                num_boxes,
                description,
            },
        }
    }
}

#[derive(Deserialize)]
pub struct QuickCreateRequest {
    pub email: String,
    pub customer_id: Option<Uuid>,
    pub trade_customer_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub items: Vec<ItemInput>,
    pub delivery: DeliveryInput,
    /// "offline" confirms immediately; "stripe" stays pending on an intent
    pub payment_method: String,
    pub payment_intent_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AdjustPriceRequest {
    pub item_id: Uuid,
    pub new_unit_price: Decimal,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateQuoteRequest {
    pub email: String,
    pub customer_id: Option<Uuid>,
    pub trade_customer_id: Option<Uuid>,
    pub delivery: DeliveryInput,
    pub items: Vec<NewQuoteItem>,
    pub promo_code: Option<String>,
    pub notes: Option<String>,
    pub expires_in_days: Option<i64>,
}

#[derive(Deserialize)]
pub struct NewQuoteItem {
    pub name: String,
    pub unit_price: Decimal,
    pub num_boxes: i32,
    pub vendor_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    #[serde(default)]
    pub is_sample: bool,
}

impl From<NewQuoteItem> for NewOrderItem {
    fn from(value: NewQuoteItem) -> Self {
        NewOrderItem {
            product_id: value.product_id,
            sku_id: value.sku_id,
            vendor_id: value.vendor_id,
            name: value.name,
            collection: None,
            description: None,
            num_boxes: value.num_boxes,
            sqft_needed: None,
            unit_price: value.unit_price,
            sell_by: SellBy::Unit,
            price_tier: None,
            is_sample: value.is_sample,
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateQuoteRequest {
    pub email: Option<String>,
    pub notes: Option<Option<String>>,
    pub expires_in_days: Option<i64>,
    pub items: Option<Vec<NewQuoteItem>>,
}

#[derive(Deserialize)]
pub struct ConvertQuoteRequest {
    pub payment_method: String,
    pub payment_intent_id: Option<String>,
}

fn parse_payment(
    method: &str,
    intent: Option<String>,
) -> Result<RepOrderPayment> {
    match method {
        "offline" => Ok(RepOrderPayment::Offline),
        "stripe" => Ok(RepOrderPayment::Stripe {
            payment_intent_id: intent
                .ok_or_else(|| Error::BadRequest("payment_intent_id required for stripe".into()))?,
        }),
        other => Err(Error::BadRequest(format!("unknown payment method {other}"))),
    }
}

async fn login(State(ctx): State<AppContext>, Json(body): Json<LoginRequest>) -> Result<Response> {
    let rep = sales_rep::Entity::find()
        .filter(sales_rep::Column::Email.eq(body.email.to_ascii_lowercase()))
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    let valid = rep
        .as_ref()
        .map(|r| password::verify_password(&body.password, &r.password_hash))
        .unwrap_or(false);
    if !valid {
        return Err(Error::Unauthorized("invalid email or password".into()));
    }
    let rep = rep.expect("verified above");
    if !rep.is_active {
        return Err(Error::Unauthorized("account is deactivated".into()));
    }
    let (token, expires_at) = AuthService::new(ctx.db.clone())
        .issue_rep_session(rep.id)
        .await
        .map_err(api_error)?;
    format::json(serde_json::json!({
        "token": token,
        "expires_at": expires_at,
        "rep": {"id": rep.id, "name": rep.name, "email": rep.email},
    }))
}

/// Quick-create: SKU-referenced or custom lines, offline or gateway payment.
#[utoipa::path(post, path = "/api/rep/orders", tag = "rep")]
async fn quick_create(
    State(ctx): State<AppContext>,
    auth: RepAuth,
    Json(body): Json<QuickCreateRequest>,
) -> Result<Response> {
    let payment = parse_payment(&body.payment_method, body.payment_intent_id)?;
    let order = OrderService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .rep_create_order(
            auth.rep_id,
            RepOrderInput {
                email: body.email,
                customer_id: body.customer_id,
                trade_customer_id: body.trade_customer_id,
                project_id: body.project_id,
                items: body.items.into_iter().map(Into::into).collect(),
                delivery: body.delivery,
                payment,
            },
        )
        .await
        .map_err(api_error)?;
    format::json(order)
}

async fn my_orders(State(ctx): State<AppContext>, auth: RepAuth) -> Result<Response> {
    let orders = order::Entity::find()
        .filter(order::Column::SalesRepId.eq(auth.rep_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(orders)
}

/// Price adjustment is rep-surface only and always leaves an audit row.
async fn adjust_price(
    State(ctx): State<AppContext>,
    auth: RepAuth,
    Path(order_id): Path<Uuid>,
    Json(body): Json<AdjustPriceRequest>,
) -> Result<Response> {
    let item = OrderService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .adjust_item_price(
            order_id,
            body.item_id,
            body.new_unit_price,
            body.reason,
            auth.rep_id,
        )
        .await
        .map_err(api_error)?;
    format::json(item)
}

async fn create_quote(
    State(ctx): State<AppContext>,
    auth: RepAuth,
    Json(body): Json<CreateQuoteRequest>,
) -> Result<Response> {
    let quote = QuoteService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .create(
            Some(auth.rep_id),
            NewQuoteInput {
                email: body.email,
                customer_id: body.customer_id,
                trade_customer_id: body.trade_customer_id,
                delivery: body.delivery,
                items: body.items.into_iter().map(Into::into).collect(),
                promo_code: body.promo_code,
                notes: body.notes,
                expires_in_days: body.expires_in_days,
            },
        )
        .await
        .map_err(api_error)?;
    format::json(quote)
}

async fn list_quotes(State(ctx): State<AppContext>, auth: RepAuth) -> Result<Response> {
    let quotes = QuoteService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .list_for_rep(auth.rep_id)
        .await
        .map_err(api_error)?;
    format::json(quotes)
}

async fn update_quote(
    State(ctx): State<AppContext>,
    _auth: RepAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateQuoteRequest>,
) -> Result<Response> {
    let quote = QuoteService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .update(
            id,
            QuoteUpdate {
                email: body.email,
                notes: body.notes,
                expires_in_days: body.expires_in_days,
                items: body
                    .items
                    .map(|items| items.into_iter().map(Into::into).collect()),
            },
        )
        .await
        .map_err(api_error)?;
    format::json(quote)
}

async fn send_quote(
    State(ctx): State<AppContext>,
    auth: RepAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let quote = QuoteService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .send(id, Some(auth.rep_id))
        .await
        .map_err(api_error)?;
    format::json(quote)
}

/// Converts the quote into an order, carrying promo and discount forward.
async fn convert_quote(
    State(ctx): State<AppContext>,
    auth: RepAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<ConvertQuoteRequest>,
) -> Result<Response> {
    let payment = parse_payment(&body.payment_method, body.payment_intent_id)?;
    let order = OrderService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .convert_quote(id, payment, Actor::rep(auth.rep_id))
        .await
        .map_err(api_error)?;
    format::json(order)
}

async fn my_commissions(State(ctx): State<AppContext>, auth: RepAuth) -> Result<Response> {
    let commissions = CommissionService::new(ctx.db.clone())
        .for_rep(auth.rep_id)
        .await
        .map_err(api_error)?;
    format::json(commissions)
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/rep")
        .add("/login", post(login))
        .add("/orders", post(quick_create))
        .add("/orders", get(my_orders))
        .add("/orders/{id}/adjust-price", post(adjust_price))
        .add("/quotes", post(create_quote))
        .add("/quotes", get(list_quotes))
        .add("/quotes/{id}", put(update_quote))
        .add("/quotes/{id}/send", post(send_quote))
        .add("/quotes/{id}/convert", post(convert_quote))
        .add("/commissions", get(my_commissions))
}
