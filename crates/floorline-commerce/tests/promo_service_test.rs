//! Promo engine: the six-step validation pipeline and its counting rules.

mod common;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use common::setup_db;
use floorline_commerce::dto::PromoItem;
use floorline_commerce::entities::promo_code;
use floorline_commerce::{CommerceError, PromoService};
use floorline_core::generate_id;

async fn seed_promo(
    db: &DatabaseConnection,
    code: &str,
    promo_type: &str,
    value: Decimal,
) -> promo_code::Model {
    promo_code::ActiveModel {
        id: Set(generate_id()),
        code: Set(code.to_string()),
        promo_type: Set(promo_type.to_string()),
        value: Set(value),
        min_order_amount: Set(None),
        max_uses: Set(None),
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

fn item(subtotal: Decimal) -> PromoItem {
    PromoItem {
        product_id: Some(Uuid::new_v4()),
        category_id: None,
        subtotal,
        is_sample: false,
    }
}

#[tokio::test]
async fn percent_discount_floors_to_two_decimals() {
    let db = setup_db().await;
    seed_promo(&db, "THIRD", "percent", dec!(33.3333)).await;
    let service = PromoService::new(db.clone());

    let eval = service
        .calculate_discount(&db, "third", &[item(dec!(10.00))], None)
        .await
        .unwrap();

    // 33.333…% of $10.00 floors to $3.33, never $3.34
    assert_eq!(eval.discount_amount, dec!(3.33));
    assert_eq!(eval.eligible_subtotal, dec!(10.00));
}

#[tokio::test]
async fn fixed_discount_caps_at_eligible_subtotal() {
    let db = setup_db().await;
    seed_promo(&db, "FIFTY", "fixed", dec!(50.00)).await;
    let service = PromoService::new(db.clone());

    let eval = service
        .calculate_discount(&db, "FIFTY", &[item(dec!(30.00))], None)
        .await
        .unwrap();
    assert_eq!(eval.discount_amount, dec!(30.00));
}

#[tokio::test]
async fn lookup_is_case_insensitive_and_unknown_codes_fail() {
    let db = setup_db().await;
    seed_promo(&db, "WELCOME10", "percent", dec!(10)).await;
    let service = PromoService::new(db.clone());

    assert!(service
        .calculate_discount(&db, "welcome10", &[item(dec!(100))], None)
        .await
        .is_ok());
    let err = service
        .calculate_discount(&db, "NOPE", &[item(dec!(100))], None)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Promo(_)));
}

#[tokio::test]
async fn inactive_and_expired_codes_are_rejected() {
    let db = setup_db().await;
    let promo = seed_promo(&db, "OLD", "percent", dec!(10)).await;
    let mut active: promo_code::ActiveModel = promo.into();
    active.expires_at = Set(Some(Utc::now() - chrono::Duration::days(1)));
    active.update(&db).await.unwrap();

    let service = PromoService::new(db.clone());
    let err = service
        .calculate_discount(&db, "OLD", &[item(dec!(100))], None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expired"));

    let promo = seed_promo(&db, "OFF", "percent", dec!(10)).await;
    let mut active: promo_code::ActiveModel = promo.into();
    active.is_active = Set(false);
    active.update(&db).await.unwrap();
    let err = service
        .calculate_discount(&db, "OFF", &[item(dec!(100))], None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no longer active"));
}

#[tokio::test]
async fn max_uses_counts_only_order_backed_usages() {
    let db = setup_db().await;
    let promo = seed_promo(&db, "ONESHOT", "percent", dec!(10)).await;
    let mut active: promo_code::ActiveModel = promo.clone().into();
    active.max_uses = Set(Some(1));
    active.update(&db).await.unwrap();

    let service = PromoService::new(db.clone());

    // a quote-only usage does not consume the global counter
    service
        .record_usage(&db, promo.id, None, Some(Uuid::new_v4()), "a@b.c", dec!(5))
        .await
        .unwrap();
    assert!(service
        .calculate_discount(&db, "ONESHOT", &[item(dec!(100))], None)
        .await
        .is_ok());

    // an order-backed usage does
    service
        .record_usage(&db, promo.id, Some(Uuid::new_v4()), None, "a@b.c", dec!(5))
        .await
        .unwrap();
    let err = service
        .calculate_discount(&db, "ONESHOT", &[item(dec!(100))], None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("usage limit"));
}

#[tokio::test]
async fn per_customer_limit_counts_by_email() {
    let db = setup_db().await;
    let promo = seed_promo(&db, "ONEEACH", "percent", dec!(10)).await;
    let mut active: promo_code::ActiveModel = promo.clone().into();
    active.max_uses_per_customer = Set(Some(1));
    active.update(&db).await.unwrap();

    let service = PromoService::new(db.clone());
    service
        .record_usage(
            &db,
            promo.id,
            Some(Uuid::new_v4()),
            None,
            "Repeat@Example.com",
            dec!(5),
        )
        .await
        .unwrap();

    let err = service
        .calculate_discount(
            &db,
            "ONEEACH",
            &[item(dec!(100))],
            Some("repeat@example.com"),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("maximum number of times"));

    // a different email is unaffected
    assert!(service
        .calculate_discount(&db, "ONEEACH", &[item(dec!(100))], Some("new@example.com"))
        .await
        .is_ok());
}

#[tokio::test]
async fn samples_are_never_eligible_and_restrictions_partition() {
    let db = setup_db().await;
    let eligible_product = Uuid::new_v4();
    let promo = seed_promo(&db, "NARROW", "percent", dec!(50)).await;
    let mut active: promo_code::ActiveModel = promo.into();
    active.restricted_product_ids = Set(Some(serde_json::json!([eligible_product.to_string()])));
    active.update(&db).await.unwrap();

    let service = PromoService::new(db.clone());
    let items = vec![
        PromoItem {
            product_id: Some(eligible_product),
            category_id: None,
            subtotal: dec!(40.00),
            is_sample: false,
        },
        item(dec!(60.00)), // different product: ineligible
        PromoItem {
            product_id: Some(eligible_product),
            category_id: None,
            subtotal: dec!(5.00),
            is_sample: true, // samples never count
        },
    ];

    let eval = service
        .calculate_discount(&db, "NARROW", &items, None)
        .await
        .unwrap();
    assert_eq!(eval.eligible_subtotal, dec!(40.00));
    assert_eq!(eval.discount_amount, dec!(20.00));
}

#[tokio::test]
async fn min_order_checks_full_product_subtotal() {
    let db = setup_db().await;
    let promo = seed_promo(&db, "BIG", "percent", dec!(10)).await;
    let mut active: promo_code::ActiveModel = promo.into();
    active.min_order_amount = Set(Some(dec!(500)));
    active.update(&db).await.unwrap();

    let service = PromoService::new(db.clone());
    let err = service
        .calculate_discount(&db, "BIG", &[item(dec!(499.99))], None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("at least"));
}
