//! PO engine: revisions, dispatch fallback, and the item-status roll-up.

mod common;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use common::{seed_product, seed_sku, seed_trade_customer, seed_vendor, setup_db};
use floorline_commerce::dto::{Actor, DeliveryInput, OrderStatusUpdate, TradeBulkItem};
use floorline_commerce::entities::{
    po_activity_log, purchase_order, purchase_order_item, vendor,
};
use floorline_commerce::services::{EdiDispatchReceipt, PoDispatch};
use floorline_commerce::types::{DeliveryMethod, PoItemStatus, PoStatus};
use floorline_commerce::{CommerceResult, OrderService, PurchaseOrderService};
use floorline_test_utils::mock_transactional_event_bus;

/// Scriptable dispatcher: EDI can be told to fail, email records sends.
#[derive(Default)]
struct ScriptedDispatch {
    fail_edi: AtomicBool,
    emails: Mutex<Vec<String>>,
}

#[async_trait]
impl PoDispatch for ScriptedDispatch {
    async fn send_edi(
        &self,
        po: &purchase_order::Model,
        _items: &[purchase_order_item::Model],
        _vendor: &vendor::Model,
    ) -> CommerceResult<EdiDispatchReceipt> {
        if self.fail_edi.load(Ordering::SeqCst) {
            return Err(floorline_commerce::CommerceError::Gateway(
                "sftp unreachable".into(),
            ));
        }
        Ok(EdiDispatchReceipt {
            interchange_control_number: 4242,
            file_name: format!("{}.850", po.po_number),
        })
    }

    async fn send_email(
        &self,
        _po: &purchase_order::Model,
        _items: &[purchase_order_item::Model],
        vendor_email: &str,
    ) -> CommerceResult<()> {
        self.emails.lock().unwrap().push(vendor_email.to_string());
        Ok(())
    }
}

async fn confirmed_order_with_po(
    db: &DatabaseConnection,
    orders: &OrderService,
) -> purchase_order::Model {
    let vendor = seed_vendor(db, "ACME").await;
    let product = seed_product(db, vendor.id, "White Oak 7in", dec!(40), None).await;
    seed_sku(db, product.id, "ACM-OAK-7", dec!(70.00), dec!(120.00)).await;
    let trade = seed_trade_customer(db, Decimal::ZERO).await;
    let order = orders
        .place_trade_order(
            trade.id,
            vec![TradeBulkItem {
                vendor_sku: "ACM-OAK-7".to_string(),
                num_boxes: 2,
                sqft_needed: None,
            }],
            DeliveryInput {
                method: DeliveryMethod::Pickup,
                address: None,
                selection: None,
            },
        )
        .await
        .unwrap();
    orders
        .update_status(
            order.id,
            OrderStatusUpdate {
                status: "confirmed".to_string(),
                ..Default::default()
            },
            Actor::staff(Uuid::new_v4()),
        )
        .await
        .unwrap();
    purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn revision_flow_sent_reverted_revised() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus.clone());
    let pos = PurchaseOrderService::new(db.clone(), bus);
    let po = confirmed_order_with_po(&db, &orders).await;
    let actor = Actor::staff(Uuid::new_v4());

    // first send: revision 1, not revised
    let sent = pos
        .update_status(po.id, PoStatus::Sent, &actor)
        .await
        .unwrap();
    assert_eq!(sent.revision, 1);
    assert!(!sent.is_revised);
    assert!(sent.approved_at.is_some());

    // revert clears the approval
    let reverted = pos
        .update_status(po.id, PoStatus::Draft, &actor)
        .await
        .unwrap();
    assert!(reverted.approved_by.is_none());
    assert!(reverted.approved_at.is_none());

    // edit a cost while draft
    let item = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    pos.update_item(po.id, item.id, None, Some(dec!(65.00)))
        .await
        .unwrap();

    // second send: revision 2, revised
    let resent = pos
        .update_status(po.id, PoStatus::Sent, &actor)
        .await
        .unwrap();
    assert_eq!(resent.revision, 2);
    assert!(resent.is_revised);
    assert_eq!(resent.subtotal, dec!(130.00));

    let actions: Vec<String> = po_activity_log::Entity::find()
        .filter(po_activity_log::Column::PurchaseOrderId.eq(po.id))
        .order_by_asc(po_activity_log::Column::CreatedAt)
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.action)
        .collect();
    assert!(actions.contains(&"sent".to_string()));
    assert!(actions.contains(&"reverted".to_string()));
    assert!(actions.contains(&"revised_and_sent".to_string()));
}

#[tokio::test]
async fn non_draft_pos_reject_content_edits() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus.clone());
    let pos = PurchaseOrderService::new(db.clone(), bus);
    let po = confirmed_order_with_po(&db, &orders).await;
    let actor = Actor::staff(Uuid::new_v4());

    pos.update_status(po.id, PoStatus::Sent, &actor)
        .await
        .unwrap();
    let item = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let err = pos
        .update_item(po.id, item.id, Some(5), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        floorline_commerce::CommerceError::PurchaseOrderNotEditable
    ));

    // but per-item statuses still advance on a sent PO
    pos.update_item_status(item.id, PoItemStatus::Ordered, &actor)
        .await
        .unwrap();
}

#[tokio::test]
async fn item_statuses_roll_up_to_fulfilled_and_cancelled() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus.clone());
    let pos = PurchaseOrderService::new(db.clone(), bus);
    let po = confirmed_order_with_po(&db, &orders).await;
    let actor = Actor::staff(Uuid::new_v4());
    pos.update_status(po.id, PoStatus::Sent, &actor)
        .await
        .unwrap();

    let items = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
        .all(&db)
        .await
        .unwrap();
    for item in &items {
        pos.update_item_status(item.id, PoItemStatus::Received, &actor)
            .await
            .unwrap();
    }
    let fulfilled = purchase_order::Entity::find_by_id(po.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fulfilled.status, "fulfilled");

    // a second PO rolls up to cancelled when every item cancels
    let po2 = {
        let orders2 = orders.clone();
        confirmed_order_with_po(&db, &orders2).await
    };
    let items2 = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(po2.id))
        .all(&db)
        .await
        .unwrap();
    for item in &items2 {
        pos.update_item_status(item.id, PoItemStatus::Cancelled, &actor)
            .await
            .unwrap();
    }
    let cancelled = purchase_order::Entity::find_by_id(po2.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
}

#[tokio::test]
async fn dispatch_falls_back_to_email_when_edi_fails() {
    let db = setup_db().await;
    let (bus, transport) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus.clone());
    let pos = PurchaseOrderService::new(db.clone(), bus);
    let po = confirmed_order_with_po(&db, &orders).await;
    let actor = Actor::staff(Uuid::new_v4());

    // flip the vendor to EDI-enabled
    let vendor_row = vendor::Entity::find_by_id(po.vendor_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: vendor::ActiveModel = sea_orm::IntoActiveModel::into_active_model(vendor_row);
    active.edi_config = sea_orm::Set(Some(serde_json::json!({"enabled": true})));
    sea_orm::ActiveModelTrait::update(active, &db).await.unwrap();

    let dispatch = ScriptedDispatch::default();
    dispatch.fail_edi.store(true, Ordering::SeqCst);

    let sent = pos.send_po(po.id, &dispatch, &actor).await.unwrap();
    assert_eq!(sent.status, "sent");
    assert_eq!(sent.revision, 1);
    // EDI failed, email took over, no interchange was recorded
    assert!(sent.edi_interchange_id.is_none());
    assert_eq!(dispatch.emails.lock().unwrap().len(), 1);
    assert!(transport.has_event_of_type("purchase_order.sent"));
}

#[tokio::test]
async fn edi_dispatch_records_interchange_and_transaction_row() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus.clone());
    let pos = PurchaseOrderService::new(db.clone(), bus);
    let po = confirmed_order_with_po(&db, &orders).await;
    let actor = Actor::staff(Uuid::new_v4());

    let vendor_row = vendor::Entity::find_by_id(po.vendor_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: vendor::ActiveModel = sea_orm::IntoActiveModel::into_active_model(vendor_row);
    active.edi_config = sea_orm::Set(Some(serde_json::json!({"enabled": true})));
    sea_orm::ActiveModelTrait::update(active, &db).await.unwrap();

    let dispatch = ScriptedDispatch::default();
    let sent = pos.send_po(po.id, &dispatch, &actor).await.unwrap();
    assert_eq!(sent.edi_interchange_id.as_deref(), Some("4242"));

    use floorline_commerce::entities::edi_transaction;
    let rows = edi_transaction::Entity::find()
        .filter(edi_transaction::Column::PurchaseOrderId.eq(po.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].transaction_type, "850");
    assert_eq!(rows[0].status, "sent");
    assert_eq!(rows[0].interchange_control_number, 4242);

    // the 855 path advances the PO to acknowledged
    let po_id = pos.acknowledge_by_interchange(4242).await.unwrap();
    assert_eq!(po_id, Some(po.id));
    let acked = purchase_order::Entity::find_by_id(po.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(acked.status, "acknowledged");
}
