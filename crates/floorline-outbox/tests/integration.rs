//! Outbox semantics: events become visible with the transaction, never
//! without it, and the relay drains them exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{EntityTrait, PaginatorTrait, TransactionTrait};
use sea_orm_migration::{MigrationTrait, MigratorTrait};

use floorline_core::events::{DomainEvent, EventEnvelope, EventTransport};
use floorline_core::generate_id;
use floorline_outbox::{
    OutboxRelay, OutboxTransport, SysEventStatus, SysEvents, SysEventsMigration,
    TransactionalEventBus,
};
use floorline_test_utils::setup_test_db_with_migrations;

struct TestMigrator;

impl MigratorTrait for TestMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(SysEventsMigration)]
    }
}

struct CountingTarget {
    delivered: AtomicUsize,
}

#[async_trait]
impl EventTransport for CountingTarget {
    async fn publish(&self, _envelope: EventEnvelope) -> floorline_core::Result<()> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn sample_event() -> DomainEvent {
    DomainEvent::OrderMutated {
        order_id: generate_id(),
    }
}

#[tokio::test]
async fn committed_transactions_make_events_visible() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let bus = TransactionalEventBus::new(Arc::new(OutboxTransport::new(db.clone())));

    let txn = db.begin().await.unwrap();
    bus.publish_in_tx(&txn, None, sample_event()).await.unwrap();
    // not visible before commit
    assert_eq!(SysEvents::find().count(&db).await.unwrap(), 0);
    txn.commit().await.unwrap();
    assert_eq!(SysEvents::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn rolled_back_transactions_leave_no_events() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let bus = TransactionalEventBus::new(Arc::new(OutboxTransport::new(db.clone())));

    let txn = db.begin().await.unwrap();
    bus.publish_in_tx(&txn, None, sample_event()).await.unwrap();
    txn.rollback().await.unwrap();

    assert_eq!(SysEvents::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn relay_dispatches_pending_rows_once() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let bus = TransactionalEventBus::new(Arc::new(OutboxTransport::new(db.clone())));

    let txn = db.begin().await.unwrap();
    bus.publish_in_tx(&txn, None, sample_event()).await.unwrap();
    bus.publish_in_tx(&txn, None, sample_event()).await.unwrap();
    txn.commit().await.unwrap();

    let target = Arc::new(CountingTarget {
        delivered: AtomicUsize::new(0),
    });
    let relay = OutboxRelay::new(db.clone(), target.clone());

    let processed = relay.process_pending_once().await.unwrap();
    assert_eq!(processed, 2);
    assert_eq!(target.delivered.load(Ordering::SeqCst), 2);

    // a second pass finds nothing
    assert_eq!(relay.process_pending_once().await.unwrap(), 0);
    let rows = SysEvents::find().all(&db).await.unwrap();
    assert!(rows
        .iter()
        .all(|row| row.status == SysEventStatus::Dispatched));
    assert_eq!(relay.metrics().success_total, 2);
}

#[tokio::test]
async fn invalid_events_are_rejected_before_the_outbox() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let bus = TransactionalEventBus::new(Arc::new(OutboxTransport::new(db.clone())));

    let txn = db.begin().await.unwrap();
    let err = bus
        .publish_in_tx(
            &txn,
            None,
            DomainEvent::OrderStatusChanged {
                order_id: generate_id(),
                from: "pending".to_string(),
                to: "pending".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("validation"));
}
