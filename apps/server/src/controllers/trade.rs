use axum::extract::{Path, State};
use loco_rs::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use floorline_auth::{password, AuthService};
use floorline_commerce::dto::{DeliveryInput, TradeBulkItem};
use floorline_commerce::entities::{order, trade_customer, trade_document};
use floorline_commerce::OrderService;
use floorline_storage::DocumentStore;
use rust_decimal::Decimal;

use crate::common::{api_error, FloorlineSettings};
use crate::extractors::TradeAuth;
use crate::services::event_bus_from_context;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct BulkItem {
    pub vendor_sku: String,
    pub num_boxes: i32,
    pub sqft_needed: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct BulkOrderRequest {
    pub items: Vec<BulkItem>,
    pub delivery: DeliveryInput,
}

async fn login(State(ctx): State<AppContext>, Json(body): Json<LoginRequest>) -> Result<Response> {
    let account = trade_customer::Entity::find()
        .filter(trade_customer::Column::Email.eq(body.email.to_ascii_lowercase()))
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    let valid = account
        .as_ref()
        .map(|t| password::verify_password(&body.password, &t.password_hash))
        .unwrap_or(false);
    if !valid {
        return Err(Error::Unauthorized("invalid email or password".into()));
    }
    let account = account.expect("verified above");
    if !account.is_active {
        return Err(Error::Unauthorized("account is deactivated".into()));
    }
    let (token, expires_at) = AuthService::new(ctx.db.clone())
        .issue_trade_session(account.id)
        .await
        .map_err(api_error)?;
    format::json(serde_json::json!({
        "token": token,
        "expires_at": expires_at,
        "trade_customer": {
            "id": account.id,
            "company_name": account.company_name,
            "discount_percent": account.discount_percent,
            "is_approved": account.is_approved,
        },
    }))
}

/// Bulk order by SKU list, priced at the account's tier discount.
#[utoipa::path(post, path = "/api/trade/orders", tag = "trade")]
async fn place_bulk_order(
    State(ctx): State<AppContext>,
    auth: TradeAuth,
    Json(body): Json<BulkOrderRequest>,
) -> Result<Response> {
    if !auth.trade.is_approved {
        return Err(Error::Unauthorized("trade account is not yet approved".into()));
    }
    let items = body
        .items
        .into_iter()
        .map(|i| TradeBulkItem {
            vendor_sku: i.vendor_sku,
            num_boxes: i.num_boxes,
            sqft_needed: i.sqft_needed,
        })
        .collect();
    let order = OrderService::new(ctx.db.clone(), event_bus_from_context(&ctx))
        .place_trade_order(auth.trade.id, items, body.delivery)
        .await
        .map_err(api_error)?;
    format::json(order)
}

async fn my_orders(State(ctx): State<AppContext>, auth: TradeAuth) -> Result<Response> {
    let orders = order::Entity::find()
        .filter(order::Column::TradeCustomerId.eq(auth.trade.id))
        .order_by_desc(order::Column::CreatedAt)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(orders)
}

async fn my_documents(State(ctx): State<AppContext>, auth: TradeAuth) -> Result<Response> {
    let documents = trade_document::Entity::find()
        .filter(trade_document::Column::TradeCustomerId.eq(auth.trade.id))
        .order_by_desc(trade_document::Column::CreatedAt)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(documents)
}

/// Presigned GET, 1 hour TTL; the bucket itself is never public.
async fn download_document(
    State(ctx): State<AppContext>,
    auth: TradeAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let document = trade_document::Entity::find_by_id(id)
        .filter(trade_document::Column::TradeCustomerId.eq(auth.trade.id))
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?
        .ok_or(Error::NotFound)?;

    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let store = DocumentStore::from_env(
        settings.storage.bucket.clone(),
        settings.storage.endpoint_url.clone(),
    )
    .await;
    let url = store
        .presigned_get(&document.object_key)
        .await
        .map_err(|e| api_error(floorline_core::Error::External(e.to_string())))?;
    format::json(serde_json::json!({"url": url, "file_name": document.file_name}))
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/trade")
        .add("/login", post(login))
        .add("/orders", post(place_bulk_order))
        .add("/orders", get(my_orders))
        .add("/documents", get(my_documents))
        .add("/documents/{id}/download", get(download_document))
}
