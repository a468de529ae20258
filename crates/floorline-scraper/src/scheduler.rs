use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use cron::Schedule;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tokio::task::JoinHandle;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::vendor_source;
use crate::error::{ScraperError, ScraperResult};
use crate::orchestrator::{Orchestrator, TriggerOutcome};

/// Registers every active source with a valid cron expression at startup;
/// source updates re-schedule, deactivation or deletion cancels.
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    handles: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            handles: Mutex::new(HashMap::new()),
        })
    }

    #[instrument(skip(self))]
    pub async fn start(self: &Arc<Self>) -> ScraperResult<usize> {
        let sources = vendor_source::Entity::find()
            .filter(vendor_source::Column::IsActive.eq(true))
            .all(self.orchestrator.db())
            .await?;
        let mut scheduled = 0;
        for source in sources {
            if source.cron_schedule.is_none() {
                continue;
            }
            match self.schedule(&source) {
                Ok(()) => scheduled += 1,
                Err(err) => {
                    tracing::warn!(source = %source.name, error = %err, "source not scheduled")
                }
            }
        }
        tracing::info!(scheduled, "scrape scheduler started");
        Ok(scheduled)
    }

    pub fn schedule(self: &Arc<Self>, source: &vendor_source::Model) -> ScraperResult<()> {
        let Some(expr) = source.cron_schedule.as_deref() else {
            return Err(ScraperError::InvalidCron("<empty>".into()));
        };
        let schedule =
            Schedule::from_str(expr).map_err(|_| ScraperError::InvalidCron(expr.to_string()))?;

        self.unschedule(source.id);

        let orchestrator = Arc::clone(&self.orchestrator);
        let source_id = source.id;
        let source_name = source.name.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(Utc).next() else {
                    break;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
                match orchestrator.trigger(source_id).await {
                    Ok(TriggerOutcome::Started { job_id }) => {
                        tracing::info!(source = %source_name, %job_id, "scheduled scrape started");
                    }
                    Ok(TriggerOutcome::Skipped { existing_job_id }) => {
                        tracing::info!(
                            source = %source_name,
                            %existing_job_id,
                            "scheduled scrape skipped, already running"
                        );
                    }
                    Err(err) => {
                        tracing::error!(source = %source_name, error = %err, "scheduled scrape failed to start");
                    }
                }
            }
        });
        self.handles.lock().unwrap().insert(source_id, handle);
        Ok(())
    }

    /// Re-read the source after an update; deactivated or cron-less sources
    /// just come off the schedule.
    pub async fn reschedule(self: &Arc<Self>, source_id: Uuid) -> ScraperResult<()> {
        let source = vendor_source::Entity::find_by_id(source_id)
            .one(self.orchestrator.db())
            .await?;
        match source {
            Some(source) if source.is_active && source.cron_schedule.is_some() => {
                self.schedule(&source)
            }
            _ => {
                self.unschedule(source_id);
                Ok(())
            }
        }
    }

    pub fn unschedule(&self, source_id: Uuid) {
        if let Some(handle) = self.handles.lock().unwrap().remove(&source_id) {
            handle.abort();
        }
    }

    pub fn scheduled_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }
}
