use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router as AxumRouter;
use loco_rs::{
    app::{AppContext, Hooks, Initializer},
    boot::{create_app, BootResult, StartMode},
    config::Config,
    controller::AppRoutes,
    environment::Environment,
    prelude::Queue,
    task::Tasks,
    Result,
};
use sea_orm::{EntityTrait, QueryOrder};

use floorline_commerce::entities::edi_transaction;
use floorline_commerce::CommissionService;
use floorline_core::events::EventDispatcher;
use floorline_edi::InterchangeCounter;
use floorline_email::EmailService;
use floorline_outbox::TransactionalEventBus;
use floorline_scraper::{Orchestrator, OrchestratorConfig, Pools, Scheduler};
use migration::Migrator;

use crate::common::FloorlineSettings;
use crate::controllers;
use crate::scrapers;
use crate::services::handlers::{
    CommissionHandler, EmailHandler, RepNotificationHandler, ScrapeFailurePublisher,
};
use crate::services::EventRuntime;
use crate::tasks::lifecycle::LifecycleTask;
use crate::timers;

/// Marker so worker wiring runs once per process.
struct BackgroundWorkersStarted;

pub struct App;

#[async_trait]
impl Hooks for App {
    fn app_name() -> &'static str {
        env!("CARGO_PKG_NAME")
    }

    fn app_version() -> String {
        format!(
            "{} ({})",
            env!("CARGO_PKG_VERSION"),
            option_env!("BUILD_SHA").unwrap_or("dev")
        )
    }

    async fn boot(
        mode: StartMode,
        environment: &Environment,
        config: Config,
    ) -> Result<BootResult> {
        create_app::<Self, Migrator>(mode, environment, config).await
    }

    fn routes(_ctx: &AppContext) -> AppRoutes {
        AppRoutes::with_default_routes()
            .add_route(controllers::health::routes())
            .add_route(controllers::cart::routes())
            .add_route(controllers::shipping::routes())
            .add_route(controllers::checkout::routes())
            .add_route(controllers::customer::routes())
            .add_route(controllers::trade::routes())
            .add_route(controllers::rep::routes())
            .add_route(controllers::admin::staff::routes())
            .add_route(controllers::admin::orders::routes())
            .add_route(controllers::admin::purchase_orders::routes())
            .add_route(controllers::admin::scraper::routes())
            .add_route(controllers::webhooks::routes())
    }

    async fn after_routes(router: AxumRouter, ctx: &AppContext) -> Result<AxumRouter> {
        let settings = FloorlineSettings::from_settings(&ctx.config.settings);

        let email = match (&settings.email.enabled, &settings.email.smtp) {
            (true, Some(smtp)) => EmailService::smtp(smtp).unwrap_or(EmailService::Disabled),
            _ => EmailService::disabled(),
        };

        // outbox → dispatcher pipeline: commissions, email, rep pings
        let dispatcher = EventDispatcher::new()
            .register(Arc::new(CommissionHandler::new(CommissionService::new(
                ctx.db.clone(),
            ))))
            .register(Arc::new(EmailHandler::new(
                ctx.db.clone(),
                email.clone(),
                settings.ops_email.clone(),
            )))
            .register(Arc::new(RepNotificationHandler::new(
                ctx.db.clone(),
                email.clone(),
            )));
        let event_runtime = EventRuntime::new(ctx, dispatcher);
        ctx.shared_store.insert(event_runtime.clone());

        // interchange control numbers resume after the highest one on record
        let seed = edi_transaction::Entity::find()
            .order_by_desc(edi_transaction::Column::InterchangeControlNumber)
            .one(&ctx.db)
            .await?
            .map(|t| t.interchange_control_number + 1)
            .unwrap_or(1);
        ctx.shared_store
            .insert(Arc::new(InterchangeCounter::new(seed)));

        let bus = TransactionalEventBus::new(event_runtime.transport.clone());
        let orchestrator = Orchestrator::new(
            ctx.db.clone(),
            Arc::new(scrapers::build_registry()),
            Pools::new(
                settings.scraper.catalog_slots,
                settings.scraper.enrichment_slots,
            ),
            OrchestratorConfig {
                job_timeout: settings.scraper_timeout(),
                stale_after: settings.stale_job_threshold(),
            },
            Arc::new(ScrapeFailurePublisher::new(bus)),
        );
        ctx.shared_store.insert(orchestrator.clone());
        ctx.shared_store.insert(Scheduler::new(orchestrator));

        Ok(router)
    }

    async fn connect_workers(ctx: &AppContext, _queue: &Queue) -> Result<()> {
        if ctx.shared_store.contains::<BackgroundWorkersStarted>() {
            return Ok(());
        }
        ctx.shared_store.insert(BackgroundWorkersStarted);

        let Some(event_runtime) = ctx.shared_store.get::<EventRuntime>() else {
            return Ok(());
        };
        let relay = event_runtime.relay(ctx);
        tokio::spawn(async move { relay.run().await });

        if let Some(orchestrator) = ctx.shared_store.get::<Arc<Orchestrator>>() {
            timers::spawn_all(ctx, orchestrator);
        }
        if let Some(scheduler) = ctx.shared_store.get::<Arc<Scheduler>>() {
            if let Err(err) = scheduler.start().await {
                tracing::error!(error = %err, "scrape scheduler failed to start");
            }
        }

        Ok(())
    }

    async fn truncate(_ctx: &AppContext) -> Result<()> {
        Ok(())
    }

    fn register_tasks(tasks: &mut Tasks) {
        tasks.register(LifecycleTask);
    }

    async fn initializers(_ctx: &AppContext) -> Result<Vec<Box<dyn Initializer>>> {
        Ok(vec![])
    }

    async fn seed(_ctx: &AppContext, _path: &Path) -> Result<()> {
        Ok(())
    }
}
