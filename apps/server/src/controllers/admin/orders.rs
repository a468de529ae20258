use axum::extract::{Path, State};
use loco_rs::prelude::*;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use floorline_commerce::dto::{Actor, NewOrderItem, OrderStatusUpdate, ShippingSelection};
use floorline_commerce::entities::{order, order_activity_log, order_payment};
use floorline_commerce::types::{BalanceStatus, SellBy};
use floorline_commerce::{OrderService, PaymentService};

use crate::common::{api_error, FloorlineSettings};
use crate::extractors::StaffAuth;
use crate::services::{event_bus_from_context, StripeGateway};

#[derive(Deserialize)]
pub struct RefundRequest {
    pub amount: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct PaymentRequestBody {
    pub amount: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    pub unit_price: Decimal,
    pub num_boxes: i32,
    pub vendor_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    #[serde(default)]
    pub is_sample: bool,
}

#[derive(Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DeliveryChangeRequest {
    Pickup,
    Shipping {
        address: serde_json::Value,
        selection: ShippingSelection,
    },
}

fn order_service(ctx: &AppContext) -> OrderService {
    OrderService::new(ctx.db.clone(), event_bus_from_context(ctx))
}

fn payment_service(ctx: &AppContext) -> PaymentService {
    PaymentService::new(ctx.db.clone(), event_bus_from_context(ctx))
}

async fn get_order(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let service = order_service(&ctx);
    let order = service.get(id).await.map_err(api_error)?;
    let items = service.items(id).await.map_err(api_error)?;
    let payments = payment_service(&ctx).ledger(id).await.map_err(api_error)?;
    let activity = order_activity_log::Entity::find()
        .filter(order_activity_log::Column::OrderId.eq(id))
        .order_by_asc(order_activity_log::Column::CreatedAt)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    let balance_status = BalanceStatus::derive(order.total, order.amount_paid);
    format::json(serde_json::json!({
        "order": order,
        "items": items,
        "payments": payments,
        "activity": activity,
        "balance_status": balance_status,
    }))
}

async fn list_orders(State(ctx): State<AppContext>, _auth: StaffAuth) -> Result<Response> {
    let orders = order::Entity::find()
        .order_by_desc(order::Column::CreatedAt)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(orders)
}

/// Status transitions, with all their cascades (PO generation, PO
/// cancellation, un-cancel cleanup). `refunded` is rejected here; the
/// refund endpoint is its only writer.
#[utoipa::path(put, path = "/api/admin/orders/{id}/status", tag = "admin-orders")]
async fn update_status(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<OrderStatusUpdate>,
) -> Result<Response> {
    let order = order_service(&ctx)
        .update_status(id, body, Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::json(order)
}

/// Refund with an optional amount; omitting it refunds the full remainder
/// and requires the order to be cancelled first.
#[utoipa::path(post, path = "/api/admin/orders/{id}/refund", tag = "admin-orders")]
async fn refund(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<RefundRequest>,
) -> Result<Response> {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let gateway = StripeGateway::from_settings(&settings);
    let order = payment_service(&ctx)
        .refund(id, body.amount, &gateway, Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::json(order)
}

/// Sends a balance-due checkout link to the buyer.
#[utoipa::path(post, path = "/api/admin/orders/{id}/payment-request", tag = "admin-orders")]
async fn payment_request(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentRequestBody>,
) -> Result<Response> {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let gateway = StripeGateway::from_settings(&settings);
    let request = payment_service(&ctx)
        .create_payment_request(id, body.amount, &gateway, Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::json(request)
}

async fn add_item(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<AddItemRequest>,
) -> Result<Response> {
    let item = order_service(&ctx)
        .add_item(
            id,
            NewOrderItem {
                product_id: body.product_id,
                sku_id: body.sku_id,
                vendor_id: body.vendor_id,
                name: body.name,
                collection: None,
                description: None,
                num_boxes: body.num_boxes,
                sqft_needed: None,
                unit_price: body.unit_price,
                sell_by: SellBy::Unit,
                price_tier: None,
                is_sample: body.is_sample,
            },
            Actor::staff(auth.staff.id),
        )
        .await
        .map_err(api_error)?;
    format::json(item)
}

async fn remove_item(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Response> {
    order_service(&ctx)
        .remove_item(id, item_id, Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::empty_json()
}

/// Delivery-method change. Switching to shipping is phase two of the
/// two-phase flow: the caller picked a rate from `/shipping/estimate`.
async fn change_delivery(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<DeliveryChangeRequest>,
) -> Result<Response> {
    let actor = Actor::staff(auth.staff.id);
    let order = match body {
        DeliveryChangeRequest::Pickup => order_service(&ctx)
            .set_delivery_pickup(id, actor)
            .await
            .map_err(api_error)?,
        DeliveryChangeRequest::Shipping { address, selection } => order_service(&ctx)
            .set_delivery_shipping(id, address, selection, actor)
            .await
            .map_err(api_error)?,
    };
    format::json(order)
}

async fn ledger(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let payments: Vec<order_payment::Model> =
        payment_service(&ctx).ledger(id).await.map_err(api_error)?;
    format::json(payments)
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/admin/orders")
        .add("/", get(list_orders))
        .add("/{id}", get(get_order))
        .add("/{id}/status", put(update_status))
        .add("/{id}/refund", post(refund))
        .add("/{id}/payment-request", post(payment_request))
        .add("/{id}/add-item", post(add_item))
        .add("/{id}/items/{item_id}", delete(remove_item))
        .add("/{id}/delivery", post(change_delivery))
        .add("/{id}/payments", get(ledger))
}
