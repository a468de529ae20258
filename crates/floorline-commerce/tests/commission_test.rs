//! Commission derivation: margin math, status rules, terminal paid.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use common::{seed_product, seed_rep, seed_sku, seed_trade_customer, seed_vendor, setup_db};
use floorline_commerce::dto::{Actor, DeliveryInput, OrderStatusUpdate, TradeBulkItem};
use floorline_commerce::entities::{order, trade_customer};
use floorline_commerce::types::DeliveryMethod;
use floorline_commerce::{CommissionService, OrderService};
use floorline_test_utils::mock_transactional_event_bus;

async fn seeded_order_with_rep(
    db: &sea_orm::DatabaseConnection,
    orders: &OrderService,
) -> (order::Model, Uuid) {
    let vendor = seed_vendor(db, "ACME").await;
    let product = seed_product(db, vendor.id, "White Oak 7in", dec!(40), None).await;
    seed_sku(db, product.id, "ACM-OAK-7", dec!(70.00), dec!(120.00)).await;
    let rep = seed_rep(db, dec!(0.10)).await;
    let trade = seed_trade_customer(db, Decimal::ZERO).await;
    // assign the rep up front so the order inherits it
    let mut active: trade_customer::ActiveModel = trade.clone().into();
    active.assigned_rep_id = Set(Some(rep.id));
    active.update(db).await.unwrap();

    let order = orders
        .place_trade_order(
            trade.id,
            vec![TradeBulkItem {
                vendor_sku: "ACM-OAK-7".to_string(),
                num_boxes: 2, // $240 retail, $140 vendor cost
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
    (order, rep.id)
}

#[tokio::test]
async fn margin_uses_cost_ratio_before_pos_and_po_costs_after() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus);
    let (order, rep_id) = seeded_order_with_rep(&db, &orders).await;
    let commissions = CommissionService::new(db.clone());

    // no POs yet: vendor cost = total × 0.60
    let row = commissions.recompute(order.id).await.unwrap().unwrap();
    assert_eq!(row.sales_rep_id, rep_id);
    assert_eq!(row.vendor_cost, dec!(144.00));
    assert_eq!(row.margin, dec!(96.00));
    assert_eq!(row.amount, dec!(9.60));
    assert_eq!(row.status, "pending");

    // confirm to generate POs: vendor cost becomes the PO subtotal
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
    let row = commissions.recompute(order.id).await.unwrap().unwrap();
    assert_eq!(row.vendor_cost, dec!(140.00));
    assert_eq!(row.margin, dec!(100.00));
    assert_eq!(row.amount, dec!(10.00));
}

#[tokio::test]
async fn status_derivation_and_terminal_paid() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus);
    let (order, _rep) = seeded_order_with_rep(&db, &orders).await;
    let commissions = CommissionService::new(db.clone());
    let actor = Actor::staff(Uuid::new_v4());

    for target in ["confirmed", "shipped", "delivered"] {
        orders
            .update_status(
                order.id,
                OrderStatusUpdate {
                    status: target.to_string(),
                    ..Default::default()
                },
                actor.clone(),
            )
            .await
            .unwrap();
    }

    // delivered but unpaid: still pending
    let row = commissions.recompute(order.id).await.unwrap().unwrap();
    assert_eq!(row.status, "pending");

    // mark paid-in-full: earned
    let mut active: order::ActiveModel = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap()
        .into();
    active.amount_paid = Set(dec!(240.00));
    active.update(&db).await.unwrap();
    let row = commissions.recompute(order.id).await.unwrap().unwrap();
    assert_eq!(row.status, "earned");

    // paid is terminal under recomputation
    commissions.mark_paid(order.id).await.unwrap();
    let row = commissions.recompute(order.id).await.unwrap().unwrap();
    assert_eq!(row.status, "paid");

    // exactly one row per order
    use floorline_commerce::entities::rep_commission;
    let count = rep_commission::Entity::find()
        .filter(rep_commission::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap()
        .len();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn cancelled_orders_forfeit() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let orders = OrderService::new(db.clone(), bus);
    let (order, _rep) = seeded_order_with_rep(&db, &orders).await;
    let commissions = CommissionService::new(db.clone());

    orders
        .update_status(
            order.id,
            OrderStatusUpdate {
                status: "cancelled".to_string(),
                cancel_reason: Some("buyer changed plans".to_string()),
                ..Default::default()
            },
            Actor::staff(Uuid::new_v4()),
        )
        .await
        .unwrap();
    let row = commissions.recompute(order.id).await.unwrap().unwrap();
    assert_eq!(row.status, "forfeited");
}
