//! Status machine cascades: PO generation on confirm, cancellation
//! cascade, un-cancel regeneration, tracking guards, item mutation.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{seed_product, seed_sku, seed_trade_customer, seed_trade_tier, seed_vendor, setup_db};
use floorline_commerce::dto::{
    Actor, DeliveryInput, NewOrderItem, OrderStatusUpdate, TradeBulkItem,
};
use floorline_commerce::entities::{
    order, order_activity_log, purchase_order, purchase_order_item, trade_customer,
};
use floorline_commerce::types::{DeliveryMethod, SellBy};
use floorline_commerce::{CommerceError, OrderService};
use floorline_test_utils::mock_transactional_event_bus;

fn pickup() -> DeliveryInput {
    DeliveryInput {
        method: DeliveryMethod::Pickup,
        address: None,
        selection: None,
    }
}

async fn seed_two_vendor_catalog(db: &DatabaseConnection) -> (Uuid, Uuid) {
    let acme = seed_vendor(db, "ACME").await;
    let birch = seed_vendor(db, "BIRCH").await;
    let p1 = seed_product(db, acme.id, "White Oak 7in", dec!(40), None).await;
    let p2 = seed_product(db, birch.id, "Birch Classic", dec!(35), None).await;
    seed_sku(db, p1.id, "ACM-OAK-7", dec!(70.00), dec!(120.00)).await;
    seed_sku(db, p2.id, "BIR-CLS-5", dec!(40.00), dec!(80.00)).await;
    (acme.id, birch.id)
}

async fn place_trade_order(db: &DatabaseConnection, service: &OrderService) -> order::Model {
    let trade = seed_trade_customer(db, Decimal::ZERO).await;
    service
        .place_trade_order(
            trade.id,
            vec![
                TradeBulkItem {
                    vendor_sku: "ACM-OAK-7".to_string(),
                    num_boxes: 2,
                    sqft_needed: None,
                },
                TradeBulkItem {
                    vendor_sku: "BIR-CLS-5".to_string(),
                    num_boxes: 3,
                    sqft_needed: None,
                },
            ],
            pickup(),
        )
        .await
        .unwrap()
}

fn status(value: &str) -> OrderStatusUpdate {
    OrderStatusUpdate {
        status: value.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn confirming_generates_one_po_per_vendor_exactly_once() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    seed_two_vendor_catalog(&db).await;
    let service = OrderService::new(db.clone(), bus);
    let order = place_trade_order(&db, &service).await;
    assert_eq!(order.status, "pending");
    let actor = Actor::staff(Uuid::new_v4());

    service
        .update_status(order.id, status("confirmed"), actor.clone())
        .await
        .unwrap();
    let pos = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(pos.len(), 2);
    // ACME: 2 × $70 = 140; BIRCH: 3 × $40 = 120
    let mut subtotals: Vec<Decimal> = pos.iter().map(|po| po.subtotal).collect();
    subtotals.sort();
    assert_eq!(subtotals, vec![dec!(120.00), dec!(140.00)]);

    // bouncing back and forward must not duplicate the set
    service
        .update_status(order.id, status("pending"), actor.clone())
        .await
        .unwrap();
    service
        .update_status(order.id, status("confirmed"), actor)
        .await
        .unwrap();
    let count = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn shipped_requires_tracking_for_delivery_orders_only() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    seed_two_vendor_catalog(&db).await;
    let service = OrderService::new(db.clone(), bus);
    let order = place_trade_order(&db, &service).await; // pickup order
    let actor = Actor::staff(Uuid::new_v4());

    service
        .update_status(order.id, status("confirmed"), actor.clone())
        .await
        .unwrap();

    // pickup: no tracking required
    service
        .update_status(order.id, status("shipped"), actor.clone())
        .await
        .unwrap();

    // switch a fresh order to shipping and try again without tracking
    let order2 = place_trade_order(&db, &service).await;
    service
        .update_status(order2.id, status("confirmed"), actor.clone())
        .await
        .unwrap();
    service
        .set_delivery_shipping(
            order2.id,
            serde_json::json!({"zip": "77002"}),
            floorline_commerce::dto::ShippingSelection {
                carrier: "Estes".to_string(),
                service: "LTL".to_string(),
                cost: dec!(180.00),
                transit_days: Some(4),
                residential: true,
                liftgate: true,
                is_fallback: false,
            },
            actor.clone(),
        )
        .await
        .unwrap();

    let err = service
        .update_status(order2.id, status("shipped"), actor.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::TrackingNumberRequired));

    service
        .update_status(
            order2.id,
            OrderStatusUpdate {
                status: "shipped".to_string(),
                tracking_number: Some("PRO-445910".to_string()),
                tracking_carrier: Some("Estes".to_string()),
                ..Default::default()
            },
            actor,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn moving_backward_clears_downstream_marks_and_tracking() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    seed_two_vendor_catalog(&db).await;
    let service = OrderService::new(db.clone(), bus);
    let order = place_trade_order(&db, &service).await;
    let actor = Actor::staff(Uuid::new_v4());

    for target in ["confirmed", "shipped", "delivered"] {
        service
            .update_status(order.id, status(target), actor.clone())
            .await
            .unwrap();
    }
    let delivered = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(delivered.delivered_at.is_some());

    service
        .update_status(order.id, status("confirmed"), actor)
        .await
        .unwrap();
    let rewound = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(rewound.confirmed_at.is_some());
    assert!(rewound.shipped_at.is_none());
    assert!(rewound.delivered_at.is_none());
    assert!(rewound.tracking_number.is_none());
}

#[tokio::test]
async fn cancel_cascades_pos_and_uncancel_regenerates_equivalent_set() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    seed_two_vendor_catalog(&db).await;
    let service = OrderService::new(db.clone(), bus);
    let order = place_trade_order(&db, &service).await;
    let actor = Actor::staff(Uuid::new_v4());

    service
        .update_status(order.id, status("confirmed"), actor.clone())
        .await
        .unwrap();
    let original: Vec<(Uuid, Decimal, String)> = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|po| (po.vendor_id, po.subtotal, po.po_number))
        .collect();

    service
        .update_status(
            order.id,
            OrderStatusUpdate {
                status: "cancelled".to_string(),
                cancel_reason: Some("out of stock".to_string()),
                ..Default::default()
            },
            actor.clone(),
        )
        .await
        .unwrap();
    let cancelled_pos = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap();
    assert!(cancelled_pos.iter().all(|po| po.status == "cancelled"));

    // un-cancel deletes the cancelled set entirely
    service
        .update_status(order.id, status("pending"), actor.clone())
        .await
        .unwrap();
    assert_eq!(
        purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order.id))
            .count(&db)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        purchase_order_item::Entity::find().count(&db).await.unwrap(),
        0
    );

    // re-confirming generates an equivalent set with fresh numbers
    service
        .update_status(order.id, status("confirmed"), actor)
        .await
        .unwrap();
    let regenerated: Vec<(Uuid, Decimal, String)> = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|po| (po.vendor_id, po.subtotal, po.po_number))
        .collect();

    let key = |set: &[(Uuid, Decimal, String)]| {
        let mut pairs: Vec<(Uuid, Decimal)> = set.iter().map(|(v, s, _)| (*v, *s)).collect();
        pairs.sort();
        pairs
    };
    assert_eq!(key(&original), key(&regenerated));
    let old_numbers: Vec<&String> = original.iter().map(|(_, _, n)| n).collect();
    assert!(regenerated.iter().all(|(_, _, n)| !old_numbers.contains(&n)));
}

#[tokio::test]
async fn forward_transitions_cannot_skip_a_stage() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    seed_two_vendor_catalog(&db).await;
    let service = OrderService::new(db.clone(), bus);
    let order = place_trade_order(&db, &service).await;
    let actor = Actor::staff(Uuid::new_v4());

    // pending can only advance to confirmed; jumping past it would leave
    // the order without a PO set
    for target in ["shipped", "delivered"] {
        let err = service
            .update_status(order.id, status(target), actor.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::InvalidTransition { .. }));
    }
    assert_eq!(
        purchase_order::Entity::find()
            .filter(purchase_order::Column::OrderId.eq(order.id))
            .count(&db)
            .await
            .unwrap(),
        0
    );

    // confirmed → delivered also skips a stage
    service
        .update_status(order.id, status("confirmed"), actor.clone())
        .await
        .unwrap();
    let err = service
        .update_status(order.id, status("delivered"), actor)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::InvalidTransition { .. }));
}

#[tokio::test]
async fn refunded_is_unreachable_through_the_status_endpoint() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    seed_two_vendor_catalog(&db).await;
    let service = OrderService::new(db.clone(), bus);
    let order = place_trade_order(&db, &service).await;

    let err = service
        .update_status(order.id, status("refunded"), Actor::staff(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::RefundViaEndpointOnly));
}

#[tokio::test]
async fn add_then_remove_item_restores_order_and_po_state() {
    let db = setup_db().await;
    let (bus, _t) = mock_transactional_event_bus();
    let (acme_id, _) = seed_two_vendor_catalog(&db).await;
    let service = OrderService::new(db.clone(), bus);
    let order = place_trade_order(&db, &service).await;
    let actor = Actor::staff(Uuid::new_v4());

    service
        .update_status(order.id, status("confirmed"), actor.clone())
        .await
        .unwrap();

    let before = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let before_pos: Vec<(Uuid, Decimal)> = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|po| (po.vendor_id, po.subtotal))
        .collect();

    let item = service
        .add_item(
            order.id,
            NewOrderItem {
                product_id: None,
                sku_id: None,
                vendor_id: Some(acme_id),
                name: "Custom stair nosing".to_string(),
                collection: None,
                description: None,
                num_boxes: 4,
                sqft_needed: None,
                unit_price: dec!(55.00),
                sell_by: SellBy::Unit,
                price_tier: None,
                is_sample: false,
            },
            actor.clone(),
        )
        .await
        .unwrap();

    let mid = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mid.subtotal, before.subtotal + dec!(220.00));
    assert_eq!(mid.total, before.total + dec!(220.00));

    service
        .remove_item(order.id, item.id, actor)
        .await
        .unwrap();

    let after = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.subtotal, before.subtotal);
    assert_eq!(after.total, before.total);
    let after_pos: Vec<(Uuid, Decimal)> = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|po| (po.vendor_id, po.subtotal))
        .collect();
    let sorted = |mut v: Vec<(Uuid, Decimal)>| {
        v.sort();
        v
    };
    assert_eq!(sorted(before_pos), sorted(after_pos));
}

#[tokio::test]
async fn trade_spend_accumulates_and_promotes_tier_upward_only() {
    let db = setup_db().await;
    let (bus, transport) = mock_transactional_event_bus();
    seed_two_vendor_catalog(&db).await;
    seed_trade_tier(&db, "Silver", dec!(5), dec!(0), 1).await;
    seed_trade_tier(&db, "Gold", dec!(10), dec!(200), 2).await;
    let service = OrderService::new(db.clone(), bus);

    let trade = seed_trade_customer(&db, Decimal::ZERO).await;
    service
        .place_trade_order(
            trade.id,
            vec![TradeBulkItem {
                vendor_sku: "ACM-OAK-7".to_string(),
                num_boxes: 3,
                sqft_needed: None,
            }],
            pickup(),
        )
        .await
        .unwrap();

    let refreshed = trade_customer::Entity::find_by_id(trade.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    // $360 of spend clears the Gold threshold in one jump
    assert_eq!(refreshed.lifetime_spend, dec!(360.00));
    assert_eq!(refreshed.discount_percent, dec!(10));
    // no reps seeded, so round-robin leaves the account unassigned
    assert!(refreshed.assigned_rep_id.is_none());
    assert!(transport.has_event_of_type("trade.tier_promoted"));

    // activity log exists for creation
    let entries = order_activity_log::Entity::find().count(&db).await.unwrap();
    assert!(entries >= 1);
}
