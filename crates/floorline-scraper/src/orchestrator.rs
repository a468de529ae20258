use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use floorline_core::generate_id;

use crate::entities::{scrape_job, vendor_source};
use crate::error::{ScraperError, ScraperResult};
use crate::pools::Pools;
use crate::registry::{ScrapeStats, Scraper, ScraperRegistry};

pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// wall-clock deadline per job (`SCRAPER_TIMEOUT_MS`)
    pub job_timeout: Duration,
    /// running jobs older than this are presumed crashed (`STALE_JOB_HOURS`)
    pub stale_after: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            job_timeout: DEFAULT_JOB_TIMEOUT,
            stale_after: DEFAULT_JOB_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TriggerOutcome {
    Started { job_id: Uuid },
    Skipped { existing_job_id: Uuid },
}

/// Failure emails are a collaborator; the orchestrator never blocks on them.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn scrape_failed(&self, source_id: Uuid, source_name: &str, job_id: Uuid, reason: &str);
}

pub struct NoopNotifier;

#[async_trait]
impl FailureNotifier for NoopNotifier {
    async fn scrape_failed(&self, _source_id: Uuid, _source_name: &str, _job_id: Uuid, _reason: &str) {}
}

enum JobOutcome {
    Completed(ScrapeStats),
    Failed(String),
    TimedOut,
    Cancelled,
}

pub struct Orchestrator {
    db: DatabaseConnection,
    registry: Arc<ScraperRegistry>,
    pools: Pools,
    config: OrchestratorConfig,
    notifier: Arc<dyn FailureNotifier>,
    /// in-memory abort controllers for jobs running in this process
    running: Mutex<HashMap<Uuid, CancellationToken>>,
}

/// Removes the in-memory controller on every exit path, including panic
/// unwinding inside the job body.
struct RunningGuard {
    running: Arc<Orchestrator>,
    job_id: Uuid,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.running.lock().unwrap().remove(&self.job_id);
    }
}

impl Orchestrator {
    pub fn new(
        db: DatabaseConnection,
        registry: Arc<ScraperRegistry>,
        pools: Pools,
        config: OrchestratorConfig,
        notifier: Arc<dyn FailureNotifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            registry,
            pools,
            config,
            notifier,
            running: Mutex::new(HashMap::new()),
        })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Job lock by conditional insert: the partial unique index on
    /// (vendor_source_id) WHERE status='running' makes the insert fail when
    /// a running job exists; the loser gets a skip, not an error page.
    #[instrument(skip(self))]
    pub async fn trigger(self: &Arc<Self>, source_id: Uuid) -> ScraperResult<TriggerOutcome> {
        let source = vendor_source::Entity::find_by_id(source_id)
            .one(&self.db)
            .await?
            .ok_or(ScraperError::SourceNotFound(source_id))?;
        if !source.is_active {
            return Err(ScraperError::Validation("vendor source is inactive".into()));
        }
        let scraper = self
            .registry
            .get(&source.scraper_key)
            .ok_or_else(|| ScraperError::UnknownScraperKey(source.scraper_key.clone()))?;

        let job_id = generate_id();
        let insert = scrape_job::ActiveModel {
            id: Set(job_id),
            vendor_source_id: Set(source_id),
            status: Set("running".to_string()),
            started_at: Set(Utc::now()),
            completed_at: Set(None),
            products_found: Set(0),
            products_updated: Set(0),
            errors: Set(serde_json::json!([])),
        }
        .insert(&self.db)
        .await;

        let job = match insert {
            Ok(job) => job,
            Err(err) => {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    let existing = scrape_job::Entity::find()
                        .filter(scrape_job::Column::VendorSourceId.eq(source_id))
                        .filter(scrape_job::Column::Status.eq("running"))
                        .one(&self.db)
                        .await?;
                    if let Some(existing) = existing {
                        return Ok(TriggerOutcome::Skipped {
                            existing_job_id: existing.id,
                        });
                    }
                }
                return Err(err.into());
            }
        };

        let cancel = CancellationToken::new();
        self.running.lock().unwrap().insert(job_id, cancel.clone());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_job(job, source, scraper, cancel).await;
        });

        Ok(TriggerOutcome::Started { job_id })
    }

    async fn run_job(
        self: Arc<Self>,
        job: scrape_job::Model,
        source: vendor_source::Model,
        scraper: Arc<dyn Scraper>,
        cancel: CancellationToken,
    ) {
        let _guard = RunningGuard {
            running: Arc::clone(&self),
            job_id: job.id,
        };

        // queue for a pool slot; the permit is the slot and its drop is the release
        let _permit = tokio::select! {
            permit = self.pools.acquire(scraper.pool()) => permit,
            _ = cancel.cancelled() => {
                self.finish_job(&job, &source, JobOutcome::Cancelled).await;
                return;
            }
        };

        tracing::info!(job_id = %job.id, source = %source.name, key = %source.scraper_key, "scrape job started");
        let outcome = tokio::select! {
            _ = cancel.cancelled() => JobOutcome::Cancelled,
            result = tokio::time::timeout(
                self.config.job_timeout,
                scraper.run(&self.db, &job, &source, cancel.clone()),
            ) => match result {
                Err(_elapsed) => JobOutcome::TimedOut,
                Ok(Ok(stats)) => JobOutcome::Completed(stats),
                Ok(Err(reason)) => JobOutcome::Failed(reason),
            },
        };

        self.finish_job(&job, &source, outcome).await;
    }

    async fn finish_job(
        &self,
        job: &scrape_job::Model,
        source: &vendor_source::Model,
        outcome: JobOutcome,
    ) {
        let (status, stats, error) = match outcome {
            JobOutcome::Completed(stats) => ("completed", Some(stats), None),
            JobOutcome::Cancelled => ("cancelled", None, None),
            JobOutcome::TimedOut => (
                "failed",
                None,
                Some(format!(
                    "timed out after {}s",
                    self.config.job_timeout.as_secs()
                )),
            ),
            JobOutcome::Failed(reason) => ("failed", None, Some(reason)),
        };

        let mut errors = job.errors.as_array().cloned().unwrap_or_default();
        if let Some(error) = &error {
            errors.push(serde_json::json!(error));
        }

        let mut active: scrape_job::ActiveModel = job.clone().into();
        active.status = Set(status.to_string());
        active.completed_at = Set(Some(Utc::now()));
        if let Some(stats) = stats {
            active.products_found = Set(stats.products_found);
            active.products_updated = Set(stats.products_updated);
        }
        active.errors = Set(serde_json::Value::Array(errors));
        if let Err(err) = active.update(&self.db).await {
            tracing::error!(job_id = %job.id, error = %err, "failed to record scrape job outcome");
            return;
        }

        if status == "completed" {
            let mut source_active: vendor_source::ActiveModel = source.clone().into();
            source_active.last_scraped_at = Set(Some(Utc::now()));
            if let Err(err) = source_active.update(&self.db).await {
                tracing::error!(source_id = %source.id, error = %err, "failed to stamp last_scraped_at");
            }
        }

        tracing::info!(job_id = %job.id, status, "scrape job finished");
        if let Some(reason) = error {
            self.notifier
                .scrape_failed(source.id, &source.name, job.id, &reason)
                .await;
        }
    }

    /// Sets the job's abort signal. A running job with no in-process
    /// controller (previous process crashed) is closed out directly.
    #[instrument(skip(self))]
    pub async fn stop(&self, job_id: Uuid) -> ScraperResult<bool> {
        if let Some(token) = self.running.lock().unwrap().get(&job_id).cloned() {
            token.cancel();
            return Ok(true);
        }

        let job = scrape_job::Entity::find_by_id(job_id)
            .one(&self.db)
            .await?
            .ok_or(ScraperError::JobNotFound(job_id))?;
        if job.status != "running" {
            return Ok(false);
        }
        let mut active: scrape_job::ActiveModel = job.into();
        active.status = Set("cancelled".to_string());
        active.completed_at = Set(Some(Utc::now()));
        active.update(&self.db).await?;
        Ok(true)
    }

    /// 15-minute timer body: any `running` job older than the threshold lost
    /// its process; fail it and say so.
    #[instrument(skip(self))]
    pub async fn reap_stale(&self) -> ScraperResult<u64> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.stale_after)
                .unwrap_or_else(|_| chrono::Duration::hours(4));
        let stale = scrape_job::Entity::find()
            .filter(scrape_job::Column::Status.eq("running"))
            .filter(scrape_job::Column::StartedAt.lt(cutoff))
            .all(&self.db)
            .await?;

        let mut reaped = 0;
        for job in stale {
            let job_id = job.id;
            let source_id = job.vendor_source_id;
            let note = format!(
                "reaped: still running after {}h with no live controller",
                self.config.stale_after.as_secs() / 3600
            );
            let mut errors = job.errors.as_array().cloned().unwrap_or_default();
            errors.push(serde_json::json!(note));

            let mut active: scrape_job::ActiveModel = job.into();
            active.status = Set("failed".to_string());
            active.completed_at = Set(Some(Utc::now()));
            active.errors = Set(serde_json::Value::Array(errors));
            active.update(&self.db).await?;
            reaped += 1;

            let source_name = vendor_source::Entity::find_by_id(source_id)
                .one(&self.db)
                .await?
                .map(|s| s.name)
                .unwrap_or_else(|| source_id.to_string());
            self.notifier
                .scrape_failed(source_id, &source_name, job_id, &note)
                .await;
            tracing::warn!(job_id = %job_id, "stale scrape job reaped");
        }
        Ok(reaped)
    }

    pub fn is_running_here(&self, job_id: Uuid) -> bool {
        self.running.lock().unwrap().contains_key(&job_id)
    }
}
