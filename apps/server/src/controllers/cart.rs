use axum::extract::{Path, Query, State};
use loco_rs::prelude::*;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use floorline_commerce::CartService;

use crate::common::api_error;
use crate::extractors::OptionalTradeAuth;

#[derive(Deserialize)]
pub struct AddCartItem {
    pub session_id: String,
    pub vendor_sku: String,
    pub num_boxes: i32,
    pub sqft_needed: Option<Decimal>,
    #[serde(default)]
    pub is_sample: bool,
}

#[derive(Deserialize)]
pub struct CartQuery {
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct UpdateQty {
    pub session_id: String,
    pub num_boxes: i32,
}

/// Add a line to the anonymous cart. An approved trade caller gets their
/// tier discount folded into the stored unit price.
#[utoipa::path(post, path = "/api/cart", tag = "cart")]
async fn add_item(
    State(ctx): State<AppContext>,
    OptionalTradeAuth(trade): OptionalTradeAuth,
    Json(body): Json<AddCartItem>,
) -> Result<Response> {
    let discount = trade
        .filter(|t| t.is_approved)
        .map(|t| t.discount_percent)
        .filter(|d| *d > Decimal::ZERO);
    let item = CartService::new(ctx.db.clone())
        .add_item(
            &body.session_id,
            &body.vendor_sku,
            body.num_boxes,
            body.sqft_needed,
            body.is_sample,
            discount,
        )
        .await
        .map_err(api_error)?;
    format::json(item)
}

async fn list_items(
    State(ctx): State<AppContext>,
    Query(query): Query<CartQuery>,
) -> Result<Response> {
    let items = CartService::new(ctx.db.clone())
        .items(&query.session_id)
        .await
        .map_err(api_error)?;
    format::json(items)
}

async fn update_item(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateQty>,
) -> Result<Response> {
    let item = CartService::new(ctx.db.clone())
        .update_quantity(&body.session_id, id, body.num_boxes)
        .await
        .map_err(api_error)?;
    format::json(item)
}

async fn remove_item(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<CartQuery>,
) -> Result<Response> {
    CartService::new(ctx.db.clone())
        .remove_item(&query.session_id, id)
        .await
        .map_err(api_error)?;
    format::empty_json()
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/cart")
        .add("/", post(add_item))
        .add("/", get(list_items))
        .add("/{id}", put(update_item))
        .add("/{id}", delete(remove_item))
}
