//! Retail checkout: the cart-draining transaction and its race guards.

mod common;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use common::{seed_product, seed_sku, seed_vendor, setup_db};
use floorline_commerce::dto::{DeliveryInput, RetailCheckoutInput, ShippingSelection};
use floorline_commerce::entities::{
    cart_item, order, order_payment, promo_code, promo_code_usage, purchase_order,
};
use floorline_commerce::types::DeliveryMethod;
use floorline_commerce::{CommerceError, OrderService};
use floorline_core::generate_id;
use floorline_test_utils::mock_transactional_event_bus;

async fn seed_cart_line(
    db: &DatabaseConnection,
    session_id: &str,
    product_id: Uuid,
    sku_id: Uuid,
    unit_price: Decimal,
    num_boxes: i32,
) {
    cart_item::ActiveModel {
        id: Set(generate_id()),
        session_id: Set(session_id.to_string()),
        product_id: Set(Some(product_id)),
        sku_id: Set(Some(sku_id)),
        name: Set("White Oak 7in".to_string()),
        num_boxes: Set(num_boxes),
        sqft_needed: Set(None),
        unit_price: Set(unit_price),
        sell_by: Set("unit".to_string()),
        price_tier: Set(None),
        is_sample: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();
}

async fn seed_welcome10(db: &DatabaseConnection, max_uses: Option<i32>) -> promo_code::Model {
    promo_code::ActiveModel {
        id: Set(generate_id()),
        code: Set("WELCOME10".to_string()),
        promo_type: Set("percent".to_string()),
        value: Set(dec!(10)),
        min_order_amount: Set(None),
        max_uses: Set(max_uses),
        max_uses_per_customer: Set(None),
        restricted_category_ids: Set(None),
        restricted_product_ids: Set(None),
        is_active: Set(true),
        expires_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

fn checkout_input(session_id: &str, total: Decimal) -> RetailCheckoutInput {
    RetailCheckoutInput {
        session_id: session_id.to_string(),
        email: "buyer@example.com".to_string(),
        name: Some("Jordan Buyer".to_string()),
        account_password_hash: None,
        customer_id: None,
        trade_customer_id: None,
        delivery: DeliveryInput {
            method: DeliveryMethod::Shipping,
            address: Some(serde_json::json!({"zip": "77002"})),
            selection: Some(ShippingSelection {
                carrier: "UPS".to_string(),
                service: "Ground".to_string(),
                cost: dec!(24.50),
                transit_days: Some(4),
                residential: true,
                liftgate: true,
                is_fallback: false,
            }),
        },
        promo_code: Some("WELCOME10".to_string()),
        sample_shipping: Decimal::ZERO,
        payment_intent_id: format!("pi_{}", Uuid::new_v4().simple()),
        intent_amount: total,
    }
}

async fn seed_catalog(db: &DatabaseConnection) -> (Uuid, Uuid) {
    let vendor = seed_vendor(db, "ACME").await;
    let product = seed_product(db, vendor.id, "White Oak 7in", dec!(40), None).await;
    let sku = seed_sku(db, product.id, "ACM-OAK-7", dec!(70.00), dec!(120.00)).await;
    (product.id, sku.id)
}

#[tokio::test]
async fn retail_checkout_drains_cart_into_confirmed_order() {
    let db = setup_db().await;
    let (bus, transport) = mock_transactional_event_bus();
    let (product_id, sku_id) = seed_catalog(&db).await;
    seed_welcome10(&db, None).await;

    let session = "sess-checkout-1";
    seed_cart_line(&db, session, product_id, sku_id, dec!(120.00), 1).await;

    // subtotal 120.00, shipping 24.50, discount 12.00
    let total = dec!(120.00) + dec!(24.50) - dec!(12.00);
    let service = OrderService::new(db.clone(), bus);
    let order = service
        .place_retail_order(checkout_input(session, total))
        .await
        .unwrap();

    assert_eq!(order.subtotal, dec!(120.00));
    assert_eq!(order.shipping_cost, dec!(24.50));
    assert_eq!(order.discount_amount, dec!(12.00));
    assert_eq!(order.total, total);
    assert_eq!(order.amount_paid, total);
    assert_eq!(order.status, "confirmed");
    assert!(order.confirmed_at.is_some());

    // one completed charge in the ledger, equal to the total
    let ledger = order_payment::Entity::find()
        .filter(order_payment::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].payment_type, "charge");
    assert_eq!(ledger[0].amount, total);
    assert_eq!(ledger[0].status, "completed");

    // one draft PO for the item's vendor
    let pos = purchase_order::Entity::find()
        .filter(purchase_order::Column::OrderId.eq(order.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(pos.len(), 1);
    assert_eq!(pos[0].status, "draft");
    assert_eq!(pos[0].subtotal, dec!(70.00));

    // cart drained, promo usage recorded, events published
    let remaining = cart_item::Entity::find()
        .filter(cart_item::Column::SessionId.eq(session))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    let usages = promo_code_usage::Entity::find().count(&db).await.unwrap();
    assert_eq!(usages, 1);
    assert!(transport.has_event_of_type("order.placed"));
    assert!(transport.has_event_of_type("order.mutated"));
}

#[tokio::test]
async fn intent_amount_mismatch_rejects_and_keeps_cart() {
    let db = setup_db().await;
    let (bus, _transport) = mock_transactional_event_bus();
    let (product_id, sku_id) = seed_catalog(&db).await;
    seed_welcome10(&db, None).await;

    let session = "sess-mismatch";
    seed_cart_line(&db, session, product_id, sku_id, dec!(120.00), 1).await;

    let service = OrderService::new(db.clone(), bus);
    let err = service
        .place_retail_order(checkout_input(session, dec!(99.00)))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not match"));

    // nothing committed
    assert_eq!(order::Entity::find().count(&db).await.unwrap(), 0);
    let remaining = cart_item::Entity::find()
        .filter(cart_item::Column::SessionId.eq(session))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn commit_time_revalidation_blocks_exhausted_promo() {
    let db = setup_db().await;
    let (bus, _transport) = mock_transactional_event_bus();
    let (product_id, sku_id) = seed_catalog(&db).await;
    seed_welcome10(&db, Some(1)).await;

    let first_session = "sess-race-a";
    seed_cart_line(&db, first_session, product_id, sku_id, dec!(120.00), 1).await;
    let second_session = "sess-race-b";
    seed_cart_line(&db, second_session, product_id, sku_id, dec!(120.00), 1).await;

    let total = dec!(120.00) + dec!(24.50) - dec!(12.00);
    let service = OrderService::new(db.clone(), bus);

    // the first checkout consumes the only use
    service
        .place_retail_order(checkout_input(first_session, total))
        .await
        .unwrap();

    // the second validated fine at intent time, but commit-time
    // revalidation sees the spent counter and rolls everything back
    let err = service
        .place_retail_order(checkout_input(second_session, total))
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Promo(_)));
    assert!(err.to_string().contains("usage limit"));

    assert_eq!(order::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(
        order_payment::Entity::find().count(&db).await.unwrap(),
        1,
        "loser's ledger row must not survive the rollback"
    );
    let second_cart = cart_item::Entity::find()
        .filter(cart_item::Column::SessionId.eq(second_session))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(second_cart, 1);
}
