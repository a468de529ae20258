//! Job locking, cancellation, pool accounting, and stale reaping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::{MigrationTrait, MigratorTrait};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use floorline_core::generate_id;
use floorline_scraper::entities::{scrape_job, vendor_source};
use floorline_scraper::{
    FailureNotifier, NoopNotifier, Orchestrator, OrchestratorConfig, PoolKind, Pools, ScrapeStats,
    Scraper, ScraperError, ScraperRegistry, TriggerOutcome,
};
use floorline_test_utils::setup_test_db_with_migrations;

struct TestMigrator;

impl MigratorTrait for TestMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(floorline_scraper::ScraperMigration)]
    }
}

/// Sleeps until cancelled; counts invocations.
struct SleepyScraper {
    runs: AtomicUsize,
}

#[async_trait]
impl Scraper for SleepyScraper {
    fn key(&self) -> &'static str {
        "sleepy"
    }

    fn pool(&self) -> PoolKind {
        PoolKind::Catalog
    }

    async fn run(
        &self,
        _db: &DatabaseConnection,
        _job: &scrape_job::Model,
        _source: &vendor_source::Model,
        cancel: CancellationToken,
    ) -> Result<ScrapeStats, String> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            _ = cancel.cancelled() => Err("cancelled".to_string()),
            _ = tokio::time::sleep(Duration::from_secs(600)) => Ok(ScrapeStats::default()),
        }
    }
}

/// Finishes immediately.
struct InstantScraper;

#[async_trait]
impl Scraper for InstantScraper {
    fn key(&self) -> &'static str {
        "instant"
    }

    fn pool(&self) -> PoolKind {
        PoolKind::None
    }

    async fn run(
        &self,
        _db: &DatabaseConnection,
        _job: &scrape_job::Model,
        _source: &vendor_source::Model,
        _cancel: CancellationToken,
    ) -> Result<ScrapeStats, String> {
        Ok(ScrapeStats {
            products_found: 7,
            products_updated: 5,
        })
    }
}

async fn seed_source(db: &DatabaseConnection, key: &str) -> vendor_source::Model {
    vendor_source::ActiveModel {
        id: Set(generate_id()),
        vendor_id: Set(None),
        name: Set(format!("{key} source")),
        scraper_key: Set(key.to_string()),
        cron_schedule: Set(None),
        is_active: Set(true),
        config: Set(serde_json::json!({})),
        last_scraped_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

fn orchestrator_with(
    db: DatabaseConnection,
    registry: ScraperRegistry,
    notifier: Arc<dyn FailureNotifier>,
) -> Arc<Orchestrator> {
    Orchestrator::new(
        db,
        Arc::new(registry),
        Pools::new(2, 3),
        OrchestratorConfig::default(),
        notifier,
    )
}

#[tokio::test]
async fn concurrent_triggers_take_one_lock() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let registry = ScraperRegistry::new().register(Arc::new(SleepyScraper {
        runs: AtomicUsize::new(0),
    }));
    let orchestrator = orchestrator_with(db.clone(), registry, Arc::new(NoopNotifier));
    let source = seed_source(&db, "sleepy").await;

    let first = orchestrator.trigger(source.id).await.unwrap();
    let TriggerOutcome::Started { job_id } = first else {
        panic!("first trigger must start");
    };

    let second = orchestrator.trigger(source.id).await.unwrap();
    match second {
        TriggerOutcome::Skipped { existing_job_id } => assert_eq!(existing_job_id, job_id),
        other => panic!("second trigger must skip, got {other:?}"),
    }

    // stop releases everything and the job lands as cancelled
    assert!(orchestrator.stop(job_id).await.unwrap());
    wait_for_status(&db, job_id, "cancelled", Duration::from_secs(5)).await;

    // the lock is free again
    let third = orchestrator.trigger(source.id).await.unwrap();
    assert!(matches!(third, TriggerOutcome::Started { .. }));
}

async fn wait_for_status(db: &DatabaseConnection, job_id: Uuid, expected: &str, timeout: Duration) {
    let start = std::time::Instant::now();
    loop {
        let status = scrape_job::Entity::find_by_id(job_id)
            .one(db)
            .await
            .unwrap()
            .map(|j| j.status);
        if status.as_deref() == Some(expected) {
            return;
        }
        if start.elapsed() > timeout {
            panic!("job {job_id} never reached {expected}, last saw {status:?}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn completed_jobs_record_stats_and_stamp_source() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let registry = ScraperRegistry::new().register(Arc::new(InstantScraper));
    let orchestrator = orchestrator_with(db.clone(), registry, Arc::new(NoopNotifier));
    let source = seed_source(&db, "instant").await;

    let TriggerOutcome::Started { job_id } = orchestrator.trigger(source.id).await.unwrap() else {
        panic!("must start");
    };
    wait_for_status(&db, job_id, "completed", Duration::from_secs(5)).await;

    let job = scrape_job::Entity::find_by_id(job_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.products_found, 7);
    assert_eq!(job.products_updated, 5);
    let source = vendor_source::Entity::find_by_id(source.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(source.last_scraped_at.is_some());
}

#[tokio::test]
async fn unknown_keys_and_inactive_sources_are_rejected() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let orchestrator = orchestrator_with(db.clone(), ScraperRegistry::new(), Arc::new(NoopNotifier));

    let source = seed_source(&db, "missing-module").await;
    let err = orchestrator.trigger(source.id).await.unwrap_err();
    assert!(matches!(err, ScraperError::UnknownScraperKey(_)));

    let err = orchestrator.trigger(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ScraperError::SourceNotFound(_)));
}

struct CountingNotifier {
    notifications: AtomicUsize,
}

#[async_trait]
impl FailureNotifier for CountingNotifier {
    async fn scrape_failed(&self, _source_id: Uuid, _source_name: &str, _job_id: Uuid, _reason: &str) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn reaper_fails_stale_jobs_and_notifies() {
    let db = setup_test_db_with_migrations::<TestMigrator>().await;
    let notifier = Arc::new(CountingNotifier {
        notifications: AtomicUsize::new(0),
    });
    let orchestrator = Orchestrator::new(
        db.clone(),
        Arc::new(ScraperRegistry::new()),
        Pools::default(),
        OrchestratorConfig {
            job_timeout: Duration::from_secs(60),
            stale_after: Duration::from_secs(3600),
        },
        notifier.clone(),
    );
    let source = seed_source(&db, "sleepy").await;

    // a running job from a process that died hours ago
    scrape_job::ActiveModel {
        id: Set(generate_id()),
        vendor_source_id: Set(source.id),
        status: Set("running".to_string()),
        started_at: Set(Utc::now() - chrono::Duration::hours(6)),
        completed_at: Set(None),
        products_found: Set(0),
        products_updated: Set(0),
        errors: Set(serde_json::json!([])),
    }
    .insert(&db)
    .await
    .unwrap();

    let reaped = orchestrator.reap_stale().await.unwrap();
    assert_eq!(reaped, 1);
    assert_eq!(notifier.notifications.load(Ordering::SeqCst), 1);

    let jobs = scrape_job::Entity::find().all(&db).await.unwrap();
    assert_eq!(jobs[0].status, "failed");
    let errors = jobs[0].errors.as_array().unwrap();
    assert!(errors[0].as_str().unwrap().contains("reaped"));
}
