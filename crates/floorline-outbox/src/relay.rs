use std::cmp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::from_value;
use uuid::Uuid;

use floorline_core::events::{EventEnvelope, EventTransport};
use floorline_core::{Error, Result};

use crate::entity;
use crate::entity::SysEventStatus;

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub batch_size: u64,
    pub max_attempts: i32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub worker_id: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            worker_id: format!("relay-{}", Uuid::new_v4()),
        }
    }
}

#[derive(Debug, Default)]
struct RelayMetrics {
    success_total: AtomicU64,
    failure_total: AtomicU64,
    processed_total: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RelayMetricsSnapshot {
    pub success_total: u64,
    pub failure_total: u64,
    pub processed_total: u64,
}

/// Drains pending sys_events rows and hands the envelopes to the dispatch
/// transport. Runs until the process exits; crash recovery is claim-based.
#[derive(Clone)]
pub struct OutboxRelay {
    db: DatabaseConnection,
    target: Arc<dyn EventTransport>,
    config: RelayConfig,
    metrics: Arc<RelayMetrics>,
}

impl OutboxRelay {
    pub fn new(db: DatabaseConnection, target: Arc<dyn EventTransport>) -> Self {
        Self {
            db,
            target,
            config: RelayConfig::default(),
            metrics: Arc::new(RelayMetrics::default()),
        }
    }

    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metrics(&self) -> RelayMetricsSnapshot {
        RelayMetricsSnapshot {
            success_total: self.metrics.success_total.load(Ordering::Relaxed),
            failure_total: self.metrics.failure_total.load(Ordering::Relaxed),
            processed_total: self.metrics.processed_total.load(Ordering::Relaxed),
        }
    }

    pub async fn run(&self) {
        loop {
            match self.process_pending_once().await {
                Ok(0) => tokio::time::sleep(Duration::from_millis(100)).await,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "relay processing error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    pub async fn process_pending_once(&self) -> Result<usize> {
        let claimed = self.claim_batch().await?;
        for model in &claimed {
            self.process_claimed_event(model).await?;
        }
        Ok(claimed.len())
    }

    async fn claim_batch(&self) -> Result<Vec<entity::Model>> {
        let now = Utc::now();
        let worker_id = self.config.worker_id.clone();

        let txn = self.db.begin().await?;
        let candidates = entity::Entity::find()
            .filter(entity::Column::Status.eq(SysEventStatus::Pending))
            .filter(
                Condition::any()
                    .add(entity::Column::NextAttemptAt.is_null())
                    .add(entity::Column::NextAttemptAt.lte(now)),
            )
            .filter(entity::Column::ClaimedAt.is_null())
            .order_by_asc(entity::Column::CreatedAt)
            .limit(self.config.batch_size)
            .all(&txn)
            .await?;

        let candidate_ids: Vec<Uuid> = candidates.iter().map(|m| m.id).collect();
        if candidate_ids.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        entity::Entity::update_many()
            .filter(entity::Column::Id.is_in(candidate_ids.clone()))
            .filter(entity::Column::ClaimedAt.is_null())
            .set(entity::ActiveModel {
                claimed_by: Set(Some(worker_id.clone())),
                claimed_at: Set(Some(now)),
                ..Default::default()
            })
            .exec(&txn)
            .await?;

        let claimed = entity::Entity::find()
            .filter(entity::Column::Id.is_in(candidate_ids))
            .filter(entity::Column::ClaimedBy.eq(worker_id))
            .all(&txn)
            .await?;

        txn.commit().await?;
        Ok(claimed)
    }

    async fn process_claimed_event(&self, model: &entity::Model) -> Result<()> {
        let started = Instant::now();
        let event_id = model.id;
        let envelope: EventEnvelope = from_value(model.payload.clone())?;

        let publish_result = self.target.publish(envelope).await;
        self.metrics.processed_total.fetch_add(1, Ordering::Relaxed);

        match publish_result {
            Ok(()) => {
                tracing::debug!(
                    event_id = %event_id,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "outbox event dispatched"
                );
                self.mark_dispatched(event_id).await?;
                self.metrics.success_total.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(event_id = %event_id, error = %err, "outbox event dispatch failed");
                self.metrics.failure_total.fetch_add(1, Ordering::Relaxed);
                self.mark_failed_attempt(model, err).await
            }
        }
    }

    async fn mark_dispatched(&self, event_id: Uuid) -> Result<()> {
        let mut active: entity::ActiveModel = entity::Entity::find_by_id(event_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("sys_event {event_id}")))?
            .into();
        active.status = Set(SysEventStatus::Dispatched);
        active.dispatched_at = Set(Some(Utc::now()));
        active.claimed_by = Set(None);
        active.claimed_at = Set(None);
        active.last_error = Set(None);
        active.next_attempt_at = Set(None);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn mark_failed_attempt(&self, model: &entity::Model, error: Error) -> Result<()> {
        let retry_count = model.retry_count + 1;
        let mut active: entity::ActiveModel = entity::Entity::find_by_id(model.id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound(format!("sys_event {}", model.id)))?
            .into();

        active.retry_count = Set(retry_count);
        active.last_error = Set(Some(error.to_string()));
        active.claimed_by = Set(None);
        active.claimed_at = Set(None);

        if retry_count >= self.config.max_attempts {
            active.status = Set(SysEventStatus::Failed);
            active.next_attempt_at = Set(None);
            tracing::error!(event_id = %model.id, retry_count, "outbox event moved to DLQ");
        } else {
            let next_attempt_at = Utc::now() + self.backoff_duration(retry_count);
            active.status = Set(SysEventStatus::Pending);
            active.next_attempt_at = Set(Some(next_attempt_at));
        }

        active.update(&self.db).await?;
        Ok(())
    }

    fn backoff_duration(&self, retry_count: i32) -> chrono::Duration {
        let attempt = retry_count.saturating_sub(1) as u32;
        let factor = 2u128.pow(cmp::min(attempt, 16));
        let base_ms = self.config.backoff_base.as_millis().saturating_mul(factor);
        let capped_ms = cmp::min(base_ms, self.config.backoff_max.as_millis());
        chrono::Duration::milliseconds(capped_ms as i64)
    }
}
