//! Ledger behavior: refunds against the original intent, the cancelled
//! gate for full refunds, and payment requests.

mod common;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use common::{setup_db, MockGateway};
use floorline_commerce::dto::{Actor, OrderStatusUpdate};
use floorline_commerce::entities::{order, order_payment};
use floorline_commerce::types::BalanceStatus;
use floorline_commerce::{CommerceError, OrderService, PaymentService};
use floorline_core::generate_id;
use floorline_test_utils::mock_transactional_event_bus;

/// A delivered order paid in full through a gateway intent.
async fn seed_paid_order(db: &DatabaseConnection, total: Decimal) -> order::Model {
    let order_id = generate_id();
    let now = Utc::now();
    let order = order::ActiveModel {
        id: Set(order_id),
        order_number: Set(format!("FL-TEST-{}", Uuid::new_v4().simple())),
        email: Set("buyer@example.com".to_string()),
        customer_id: Set(None),
        trade_customer_id: Set(None),
        sales_rep_id: Set(None),
        project_id: Set(None),
        source: Set("retail".to_string()),
        delivery_method: Set("shipping".to_string()),
        shipping_address: Set(Some(serde_json::json!({"zip": "77002"}))),
        shipping_carrier: Set(Some("UPS".to_string())),
        shipping_service: Set(Some("Ground".to_string())),
        transit_days: Set(Some(4)),
        residential: Set(true),
        liftgate: Set(true),
        is_fallback_rate: Set(false),
        subtotal: Set(total),
        shipping_cost: Set(Decimal::ZERO),
        sample_shipping: Set(Decimal::ZERO),
        discount_amount: Set(Decimal::ZERO),
        total: Set(total),
        amount_paid: Set(total),
        refund_amount: Set(Decimal::ZERO),
        promo_code_id: Set(None),
        status: Set("delivered".to_string()),
        tracking_number: Set(Some("1Z999".to_string())),
        tracking_carrier: Set(Some("UPS".to_string())),
        cancel_reason: Set(None),
        confirmed_at: Set(Some(now)),
        shipped_at: Set(Some(now)),
        delivered_at: Set(Some(now)),
        cancelled_at: Set(None),
        refunded_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();

    order_payment::ActiveModel {
        id: Set(generate_id()),
        order_id: Set(order_id),
        payment_type: Set("charge".to_string()),
        amount: Set(total),
        stripe_payment_intent_id: Set(Some(format!("pi_{}", Uuid::new_v4().simple()))),
        stripe_checkout_session_id: Set(None),
        stripe_refund_id: Set(None),
        description: Set(Some("checkout charge".to_string())),
        status: Set("completed".to_string()),
        initiated_by: Set(None),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();

    order
}

#[tokio::test]
async fn refund_path_partial_then_cancelled_full() {
    let db = setup_db().await;
    let (bus, _transport) = mock_transactional_event_bus();
    let order = seed_paid_order(&db, dec!(1000.00)).await;
    let gateway = MockGateway::default();
    let payments = PaymentService::new(db.clone(), bus.clone());
    let orders = OrderService::new(db.clone(), bus);
    let actor = Actor::staff(Uuid::new_v4());

    // partial $200 refund while delivered: fine
    let updated = payments
        .refund(order.id, Some(dec!(200.00)), &gateway, actor.clone())
        .await
        .unwrap();
    assert_eq!(updated.amount_paid, dec!(800.00));
    assert_eq!(updated.refund_amount, dec!(200.00));
    assert_eq!(updated.status, "delivered");
    assert_eq!(
        BalanceStatus::derive(updated.total, updated.amount_paid),
        BalanceStatus::BalanceDue
    );
    let refund_rows = order_payment::Entity::find()
        .filter(order_payment::Column::OrderId.eq(order.id))
        .filter(order_payment::Column::PaymentType.eq("refund"))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(refund_rows.len(), 1);
    assert_eq!(refund_rows[0].amount, dec!(-200.00));

    // a full refund with no amount requires cancellation first
    let err = payments
        .refund(order.id, None, &gateway, actor.clone())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("must be cancelled"));

    orders
        .update_status(
            order.id,
            OrderStatusUpdate {
                status: "cancelled".to_string(),
                cancel_reason: Some("customer return".to_string()),
                ..Default::default()
            },
            actor.clone(),
        )
        .await
        .unwrap();

    let updated = payments
        .refund(order.id, None, &gateway, actor.clone())
        .await
        .unwrap();
    assert_eq!(updated.amount_paid, Decimal::ZERO);
    assert_eq!(updated.refund_amount, dec!(1000.00));
    assert_eq!(updated.status, "refunded");
    assert!(updated.refunded_at.is_some());

    // a refunded, cancelled order can never be un-cancelled
    let err = orders
        .update_status(
            order.id,
            OrderStatusUpdate {
                status: "confirmed".to_string(),
                ..Default::default()
            },
            actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CommerceError::InvalidTransition { .. } | CommerceError::RefundedOrderUncancel
    ));
}

#[tokio::test]
async fn refund_beyond_remainder_is_rejected_with_remaining_amount() {
    let db = setup_db().await;
    let (bus, _transport) = mock_transactional_event_bus();
    let order = seed_paid_order(&db, dec!(100.00)).await;
    let gateway = MockGateway::default();
    let payments = PaymentService::new(db.clone(), bus);

    let err = payments
        .refund(
            order.id,
            Some(dec!(150.00)),
            &gateway,
            Actor::staff(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    match err {
        CommerceError::RefundExceedsMax {
            requested,
            max_refundable,
        } => {
            assert_eq!(requested, dec!(150.00));
            assert_eq!(max_refundable, dec!(100.00));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(gateway.refunds.lock().unwrap().is_empty());
}

#[tokio::test]
async fn additional_charges_are_not_reachable_by_refunds() {
    let db = setup_db().await;
    let (bus, _transport) = mock_transactional_event_bus();
    let order = seed_paid_order(&db, dec!(100.00)).await;

    // an additional charge collected via checkout session
    order_payment::ActiveModel {
        id: Set(generate_id()),
        order_id: Set(order.id),
        payment_type: Set("additional_charge".to_string()),
        amount: Set(dec!(50.00)),
        stripe_payment_intent_id: Set(None),
        stripe_checkout_session_id: Set(Some("cs_extra".to_string())),
        stripe_refund_id: Set(None),
        description: Set(None),
        status: Set("completed".to_string()),
        initiated_by: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .unwrap();

    let gateway = MockGateway::default();
    let payments = PaymentService::new(db.clone(), bus);
    // the remainder is computed from the intent-backed charge alone
    let err = payments
        .refund(
            order.id,
            Some(dec!(120.00)),
            &gateway,
            Actor::staff(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::RefundExceedsMax { .. }));
}

#[tokio::test]
async fn payment_request_marks_paid_and_bumps_amount_paid_via_webhook() {
    let db = setup_db().await;
    let (bus, transport) = mock_transactional_event_bus();
    let order = seed_paid_order(&db, dec!(500.00)).await;

    // simulate an unpaid balance
    let mut active: order::ActiveModel = order.clone().into();
    active.amount_paid = Set(dec!(300.00));
    active.update(&db).await.unwrap();

    let gateway = MockGateway::default();
    let payments = PaymentService::new(db.clone(), bus);
    let request = payments
        .create_payment_request(order.id, None, &gateway, Actor::staff(Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(request.amount, dec!(200.00));
    assert_eq!(request.status, "pending");

    let session_id = request.stripe_checkout_session_id.clone().unwrap();
    let completed = payments
        .complete_checkout_session(&session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status, "paid");

    let refreshed = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.amount_paid, dec!(500.00));
    assert!(transport.has_event_of_type("payment_request.paid"));

    // completing twice is a no-op
    payments
        .complete_checkout_session(&session_id)
        .await
        .unwrap();
    let refreshed = order::Entity::find_by_id(order.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.amount_paid, dec!(500.00));
}
