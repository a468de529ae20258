//! Shared fixtures for the commerce integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use sea_orm_migration::{MigrationTrait, MigratorTrait};
use std::sync::Mutex;
use uuid::Uuid;

use floorline_commerce::entities::{product, sales_rep, sku, trade_customer, trade_tier, vendor};
use floorline_commerce::migration::{
    CatalogMigration, OrdersMigration, PartnersMigration, PaymentsMigration, PromosMigration,
    PurchasingMigration,
};
use floorline_commerce::services::{CheckoutSessionHandle, PaymentGateway, RefundHandle};
use floorline_commerce::CommerceResult;
use floorline_core::generate_id;
use floorline_test_utils::setup_test_db_with_migrations;

pub struct TestMigrator;

impl MigratorTrait for TestMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(CatalogMigration),
            Box::new(PartnersMigration),
            Box::new(OrdersMigration),
            Box::new(PurchasingMigration),
            Box::new(PaymentsMigration),
            Box::new(PromosMigration),
        ]
    }
}

pub async fn setup_db() -> DatabaseConnection {
    setup_test_db_with_migrations::<TestMigrator>().await
}

pub async fn seed_vendor(db: &DatabaseConnection, code: &str) -> vendor::Model {
    vendor::ActiveModel {
        id: Set(generate_id()),
        name: Set(format!("{code} Flooring Co")),
        code: Set(code.to_string()),
        email: Set(Some(format!("orders@{}.example", code.to_lowercase()))),
        edi_config: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_product(
    db: &DatabaseConnection,
    vendor_id: Uuid,
    name: &str,
    weight_per_box: Decimal,
    freight_class: Option<&str>,
) -> product::Model {
    product::ActiveModel {
        id: Set(generate_id()),
        vendor_id: Set(vendor_id),
        name: Set(name.to_string()),
        collection: Set(Some("Heritage".to_string())),
        category_id: Set(None),
        category_slug: Set(Some("hardwood".to_string())),
        freight_class: Set(freight_class.map(str::to_string)),
        weight_per_box: Set(Some(weight_per_box)),
        sqft_per_box: Set(Some(dec!(20))),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_sku(
    db: &DatabaseConnection,
    product_id: Uuid,
    vendor_sku: &str,
    cost: Decimal,
    retail: Decimal,
) -> sku::Model {
    sku::ActiveModel {
        id: Set(generate_id()),
        product_id: Set(product_id),
        vendor_sku: Set(vendor_sku.to_string()),
        price_basis: Set("per_box".to_string()),
        cost: Set(cost),
        cut_cost: Set(None),
        roll_cost: Set(None),
        retail_price: Set(retail),
        sell_by: Set("unit".to_string()),
        variant_type: Set(None),
        is_sample: Set(false),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_rep(db: &DatabaseConnection, rate: Decimal) -> sales_rep::Model {
    sales_rep::ActiveModel {
        id: Set(generate_id()),
        email: Set(floorline_test_utils::unique_email()),
        name: Set("Pat Seller".to_string()),
        password_hash: Set("unused".to_string()),
        commission_rate: Set(rate),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_trade_tier(
    db: &DatabaseConnection,
    name: &str,
    discount: Decimal,
    threshold: Decimal,
    rank: i32,
) -> trade_tier::Model {
    trade_tier::ActiveModel {
        id: Set(generate_id()),
        name: Set(name.to_string()),
        discount_percent: Set(discount),
        spend_threshold: Set(threshold),
        rank: Set(rank),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_trade_customer(
    db: &DatabaseConnection,
    discount: Decimal,
) -> trade_customer::Model {
    trade_customer::ActiveModel {
        id: Set(generate_id()),
        email: Set(floorline_test_utils::unique_email()),
        company_name: Set("Precision Floors LLC".to_string()),
        password_hash: Set("unused".to_string()),
        tier_id: Set(None),
        discount_percent: Set(discount),
        lifetime_spend: Set(Decimal::ZERO),
        assigned_rep_id: Set(None),
        is_approved: Set(true),
        is_active: Set(true),
        stripe_customer_id: Set(None),
        stripe_subscription_id: Set(None),
        subscription_status: Set(None),
        subscription_expires_at: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

/// Records gateway calls; refunds and sessions always succeed.
#[derive(Default)]
pub struct MockGateway {
    pub refunds: Mutex<Vec<(String, Decimal)>>,
    pub sessions: Mutex<Vec<(String, Decimal)>>,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Decimal,
    ) -> CommerceResult<RefundHandle> {
        self.refunds
            .lock()
            .unwrap()
            .push((payment_intent_id.to_string(), amount));
        Ok(RefundHandle {
            refund_id: format!("re_{}", Uuid::new_v4().simple()),
        })
    }

    async fn create_checkout_session(
        &self,
        order_number: &str,
        _email: &str,
        amount: Decimal,
        _description: &str,
    ) -> CommerceResult<CheckoutSessionHandle> {
        self.sessions
            .lock()
            .unwrap()
            .push((order_number.to_string(), amount));
        let session_id = format!("cs_{}", Uuid::new_v4().simple());
        Ok(CheckoutSessionHandle {
            session_id: session_id.clone(),
            url: format!("https://checkout.stripe.example/{session_id}"),
            expires_at: Utc::now() + chrono::Duration::hours(24),
        })
    }
}
