use std::sync::Arc;

use axum::extract::{Path, State};
use loco_rs::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use floorline_scraper::entities::scrape_job;
use floorline_scraper::{Orchestrator, Scheduler, TriggerOutcome};

use crate::common::api_error;
use crate::extractors::StaffAuth;

fn orchestrator(ctx: &AppContext) -> Result<Arc<Orchestrator>> {
    ctx.shared_store
        .get::<Arc<Orchestrator>>()
        .ok_or_else(|| Error::Message("scraper orchestrator not initialized".into()))
}

/// Manual trigger. A concurrent trigger for the same source gets a skip
/// with the running job's id, not a second job.
#[utoipa::path(post, path = "/api/admin/vendor-sources/{id}/scrape", tag = "admin-scraper")]
async fn trigger(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    match orchestrator(&ctx)?.trigger(id).await.map_err(api_error)? {
        TriggerOutcome::Started { job_id } => {
            format::json(serde_json::json!({"started": true, "job_id": job_id}))
        }
        TriggerOutcome::Skipped { existing_job_id } => format::json(serde_json::json!({
            "skipped": true,
            "reason": "already_running",
            "existing_job_id": existing_job_id,
        })),
    }
}

/// Sets the running job's abort signal; the runner records `cancelled`.
#[utoipa::path(post, path = "/api/admin/scrape-jobs/{id}/stop", tag = "admin-scraper")]
async fn stop(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let stopped = orchestrator(&ctx)?.stop(id).await.map_err(api_error)?;
    format::json(serde_json::json!({"stopped": stopped}))
}

async fn list_jobs(State(ctx): State<AppContext>, _auth: StaffAuth) -> Result<Response> {
    let jobs = scrape_job::Entity::find()
        .order_by_desc(scrape_job::Column::StartedAt)
        .limit(100)
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(jobs)
}

async fn job_detail(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let job = scrape_job::Entity::find_by_id(id)
        .one(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?
        .ok_or(Error::NotFound)?;
    format::json(job)
}

/// Re-reads a source after an admin edit and fixes its schedule.
async fn reschedule(
    State(ctx): State<AppContext>,
    _auth: StaffAuth,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let scheduler = ctx
        .shared_store
        .get::<Arc<Scheduler>>()
        .ok_or_else(|| Error::Message("scrape scheduler not initialized".into()))?;
    scheduler.reschedule(id).await.map_err(api_error)?;
    format::empty_json()
}

async fn list_sources(State(ctx): State<AppContext>, _auth: StaffAuth) -> Result<Response> {
    use floorline_scraper::entities::vendor_source;
    let sources = vendor_source::Entity::find()
        .filter(vendor_source::Column::IsActive.eq(true))
        .all(&ctx.db)
        .await
        .map_err(|e| api_error(floorline_core::Error::from(e)))?;
    format::json(sources)
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("/api/admin")
        .add("/vendor-sources", get(list_sources))
        .add("/vendor-sources/{id}/scrape", post(trigger))
        .add("/vendor-sources/{id}/reschedule", post(reschedule))
        .add("/scrape-jobs", get(list_jobs))
        .add("/scrape-jobs/{id}", get(job_detail))
        .add("/scrape-jobs/{id}/stop", post(stop))
}
