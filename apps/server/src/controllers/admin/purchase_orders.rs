use std::sync::Arc;

use axum::extract::{Path, State};
use loco_rs::prelude::*;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use floorline_commerce::dto::Actor;
use floorline_commerce::entities::{po_activity_log, purchase_order, purchase_order_item};
use floorline_commerce::types::{PoItemStatus, PoStatus};
use floorline_commerce::PurchaseOrderService;
use floorline_edi::InterchangeCounter;
use floorline_email::EmailService;

use crate::common::{api_error, FloorlineSettings};
use crate::extractors::StaffAuth;
use crate::services::{event_bus_from_context, PoDispatcher, RawHtmlRenderer};

#[derive(Deserialize)]
pub struct PoStatusUpdate {
    pub status: String,
}

#[derive(Deserialize)]
pub struct PoItemStatusUpdate {
    pub status: String,
}

#[derive(Deserialize)]
pub struct PoItemEdit {
    pub qty: Option<i32>,
    pub cost_per_box: Option<Decimal>,
}

fn po_service(ctx: &AppContext) -> PurchaseOrderService {
    PurchaseOrderService::new(ctx.db.clone(), event_bus_from_context(ctx))
}

fn email_service(ctx: &AppContext) -> EmailService {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    match (&settings.email.enabled, &settings.email.smtp) {
        (true, Some(smtp)) => EmailService::smtp(smtp).unwrap_or(EmailService::Disabled),
        _ => EmailService::disabled(),
    }
}

async fn get_po(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let po = purchase_order::Entity::find_by_id(id)
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?
        .ok_or(Error::NotFound)?;
    let items = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    let activity = po_activity_log::Entity::find()
        .filter(po_activity_log::Column::PurchaseOrderId.eq(id))
        .order_by_asc(po_activity_log::Column::CreatedAt)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(serde_json::json!({"purchase_order": po, "items": items, "activity": activity}))
}

/// Dispatch: EDI 850 over SFTP when the vendor is EDI-enabled, otherwise a
/// rendered email; EDI failure falls back to email when possible.
#[utoipa::path(post, path = "/api/admin/purchase-orders/{id}/send", tag = "admin-pos")]
async fn send_po(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let counter = ctx
        .shared_store
        .get::<Arc<InterchangeCounter>>()
        .unwrap_or_else(|| Arc::new(InterchangeCounter::new(1)));
    let dispatcher = PoDispatcher::new(email_service(&ctx), counter, Arc::new(RawHtmlRenderer));
    let po = po_service(&ctx)
        .send_po(id, &dispatcher, &Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::json(po)
}

/// Explicit PO transitions; draft→sent bumps the revision, sent→draft
/// clears approval.
async fn update_status(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<PoStatusUpdate>,
) -> Result<Response> {
    let target = PoStatus::parse(&body.status).map_err(api_error)?;
    let po = po_service(&ctx)
        .update_status(id, target, &Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::json(po)
}

/// Item-level progression with the fulfilled/cancelled roll-up.
async fn update_item_status(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path((_id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<PoItemStatusUpdate>,
) -> Result<Response> {
    let target = PoItemStatus::parse(&body.status).map_err(api_error)?;
    po_service(&ctx)
        .update_item_status(item_id, target, &Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::empty_json()
}

/// Draft-only content edits.
async fn edit_item(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<PoItemEdit>,
) -> Result<Response> {
    po_service(&ctx)
        .update_item(id, item_id, body.qty, body.cost_per_box)
        .await
        .map_err(api_error)?;
    format::empty_json()
}

async fn remove_item(
    State(ctx): State<AppContext>,
    auth: StaffAuth,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Response> {
    po_service(&ctx)
        .remove_po_item(id, item_id, &Actor::staff(auth.staff.id))
        .await
        .map_err(api_error)?;
    format::empty_json()
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/admin/purchase-orders")
        .add("/{id}", get(get_po))
        .add("/{id}/send", post(send_po))
        .add("/{id}/status", put(update_status))
        .add("/{id}/items/{item_id}/status", put(update_item_status))
        .add("/{id}/items/{item_id}", put(edit_item))
        .add("/{id}/items/{item_id}", delete(remove_item))
}
