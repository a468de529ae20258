//! Staff login pipeline: rate limiting, 2FA, device trust, session TTLs.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use sea_orm_migration::{MigrationTrait, MigratorTrait};
use std::time::Duration;
use uuid::Uuid;

use floorline_auth::entities::{staff_user, trusted_device};
use floorline_auth::{
    password, AuthError, AuthMigration, AuthService, LoginRateLimiter, StaffLoginOutcome,
};
use floorline_core::generate_id;
use floorline_test_utils::setup_test_db_with_migrations;

struct TestMigrator;

impl MigratorTrait for TestMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(AuthMigration)]
    }
}

async fn seed_staff(db: &DatabaseConnection, email: &str, role: &str) -> staff_user::Model {
    staff_user::ActiveModel {
        id: Set(generate_id()),
        email: Set(email.to_string()),
        password_hash: Set(password::hash_password("hunter2!").unwrap()),
        name: Set("Alex Admin".to_string()),
        role: Set(role.to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

#[tokio::test]
async fn login_without_trust_requires_single_use_code() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let staff = seed_staff(&db, "alex@floorline.example", "admin").await;
    let service = AuthService::new(db.clone());
    let limiter = LoginRateLimiter::default();

    let outcome = service
        .staff_login(
            "alex@floorline.example",
            "hunter2!",
            Some("device-abc"),
            false,
            true,
            &limiter,
        )
        .await
        .unwrap();
    let StaffLoginOutcome::TwoFactorRequired {
        staff_id, code, ..
    } = outcome
    else {
        panic!("untrusted device must require 2FA");
    };
    assert_eq!(staff_id, staff.id);

    let wrong = service
        .staff_verify_two_factor(staff.id, "000000", false, None)
        .await;
    assert!(matches!(wrong, Err(AuthError::InvalidTwoFactorCode)) || wrong.is_err());

    let (token, _expires) = service
        .staff_verify_two_factor(staff.id, &code, false, Some("device-abc"))
        .await
        .unwrap();
    let authed = service.authenticate_staff(&token).await.unwrap();
    assert_eq!(authed.id, staff.id);

    // the code is single-use
    let replay = service
        .staff_verify_two_factor(staff.id, &code, false, None)
        .await;
    assert!(replay.is_err());
}

#[tokio::test]
async fn trusted_device_skips_two_factor_until_trust_expires() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let staff = seed_staff(&db, "trusted@floorline.example", "admin").await;
    let service = AuthService::new(db.clone());
    let limiter = LoginRateLimiter::default();

    // establish trust through one full 2FA round
    let outcome = service
        .staff_login(
            "trusted@floorline.example",
            "hunter2!",
            Some("laptop-1"),
            false,
            true,
            &limiter,
        )
        .await
        .unwrap();
    let StaffLoginOutcome::TwoFactorRequired { code, .. } = outcome else {
        panic!("first login requires 2FA");
    };
    service
        .staff_verify_two_factor(staff.id, &code, false, Some("laptop-1"))
        .await
        .unwrap();

    // trusted: straight to a session
    let outcome = service
        .staff_login(
            "trusted@floorline.example",
            "hunter2!",
            Some("laptop-1"),
            true,
            true,
            &limiter,
        )
        .await
        .unwrap();
    let StaffLoginOutcome::SessionIssued {
        dev_mode_bypass, ..
    } = outcome
    else {
        panic!("trusted device must skip 2FA");
    };
    assert!(!dev_mode_bypass);

    // expire the trust record: 2FA is reinstated
    let grant = trusted_device::Entity::find()
        .filter(trusted_device::Column::StaffId.eq(staff.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: trusted_device::ActiveModel = grant.into();
    active.expires_at = Set(Utc::now() - chrono::Duration::hours(1));
    active.update(&db).await.unwrap();

    let outcome = service
        .staff_login(
            "trusted@floorline.example",
            "hunter2!",
            Some("laptop-1"),
            false,
            true,
            &limiter,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, StaffLoginOutcome::TwoFactorRequired { .. }));
}

#[tokio::test]
async fn dev_mode_without_email_transport_skips_two_factor() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    seed_staff(&db, "dev@floorline.example", "manager").await;
    let service = AuthService::new(db.clone());
    let limiter = LoginRateLimiter::default();

    let outcome = service
        .staff_login("dev@floorline.example", "hunter2!", None, false, false, &limiter)
        .await
        .unwrap();
    let StaffLoginOutcome::SessionIssued {
        dev_mode_bypass, ..
    } = outcome
    else {
        panic!("dev mode issues the session directly");
    };
    assert!(dev_mode_bypass);
}

#[tokio::test]
async fn five_failures_rate_limit_the_sixth_attempt() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    seed_staff(&db, "bruteforce@floorline.example", "admin").await;
    let service = AuthService::new(db.clone());
    let limiter = LoginRateLimiter::new(Duration::from_secs(900), 5);

    for _ in 0..5 {
        let err = service
            .staff_login(
                "bruteforce@floorline.example",
                "wrong-password",
                None,
                false,
                false,
                &limiter,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
    let err = service
        .staff_login(
            "bruteforce@floorline.example",
            "hunter2!",
            None,
            false,
            false,
            &limiter,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::RateLimited));
}

#[tokio::test]
async fn sessions_expire_and_cleanup_sweeps_them() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let staff = seed_staff(&db, "sweep@floorline.example", "admin").await;
    let service = AuthService::new(db.clone());

    let (token, _expires) = service.issue_staff_session(staff.id, false).await.unwrap();
    service.authenticate_staff(&token).await.unwrap();

    // force-expire the session
    use floorline_auth::entities::staff_session;
    let session = staff_session::Entity::find()
        .filter(staff_session::Column::StaffId.eq(staff.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut active: staff_session::ActiveModel = session.into();
    active.expires_at = Set(Utc::now() - chrono::Duration::minutes(1));
    active.update(&db).await.unwrap();

    let err = service.authenticate_staff(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidSession));

    let deleted = service.cleanup_expired().await.unwrap();
    assert!(deleted >= 1);
    let remaining = staff_session::Entity::find()
        .filter(staff_session::Column::StaffId.eq(staff.id))
        .one(&db)
        .await
        .unwrap();
    assert!(remaining.is_none());
}

#[tokio::test]
async fn rep_trade_customer_sessions_are_isolated() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let service = AuthService::new(db.clone());
    let principal = Uuid::new_v4();

    let (rep_token, _) = service.issue_rep_session(principal).await.unwrap();
    assert_eq!(service.authenticate_rep(&rep_token).await.unwrap(), principal);
    // a rep token is not valid on the trade or customer stores
    assert!(service.authenticate_trade(&rep_token).await.is_err());
    assert!(service.authenticate_customer(&rep_token).await.is_err());
}
