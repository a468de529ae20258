//! Activity-log writers. Always called inside the transaction that makes
//! the change they describe.

use sea_orm::{ConnectionTrait, EntityTrait, Set};
use uuid::Uuid;

use floorline_core::generate_id;

use crate::dto::Actor;
use crate::entities::{order_activity_log, po_activity_log};
use crate::error::CommerceResult;

pub(crate) async fn log_order_activity<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    actor: &Actor,
    action: &str,
    detail: serde_json::Value,
) -> CommerceResult<()> {
    order_activity_log::Entity::insert(order_activity_log::ActiveModel {
        id: Set(generate_id()),
        order_id: Set(order_id),
        actor: Set(Some(actor.label.clone())),
        action: Set(action.to_string()),
        detail: Set(detail),
        created_at: Set(chrono::Utc::now()),
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

pub(crate) async fn log_po_activity<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
    actor: &Actor,
    action: &str,
    detail: serde_json::Value,
) -> CommerceResult<()> {
    po_activity_log::Entity::insert(po_activity_log::ActiveModel {
        id: Set(generate_id()),
        purchase_order_id: Set(purchase_order_id),
        actor: Set(Some(actor.label.clone())),
        action: Set(action.to_string()),
        detail: Set(detail),
        created_at: Set(chrono::Utc::now()),
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}
