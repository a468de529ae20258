//! Background timers, spawned once at worker start. Each loop owns one
//! concern and logs its own failures; none of them can take the HTTP
//! surface down.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, TimeZone, Utc};
use loco_rs::app::AppContext;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use floorline_auth::AuthService;
use floorline_commerce::entities::{
    inventory_snapshot, sku, stock_alert, trade_customer, vendor,
};
use floorline_commerce::QuoteService;
use floorline_edi::{parse_855, EdiTransport, SftpConfig, SftpTransport};
use floorline_email::EmailService;
use floorline_scraper::Orchestrator;

use crate::common::FloorlineSettings;
use crate::services::event_bus_from_context;
use crate::services::gateway::StripeGateway;

const REAPER_INTERVAL: Duration = Duration::from_secs(15 * 60);
const STOCK_ALERT_INTERVAL: Duration = Duration::from_secs(30 * 60);
const EDI_POLL_INTERVAL: Duration = Duration::from_secs(30 * 60);
const DAILY_HOUR_UTC: u32 = 6;
/// a snapshot counts as fresh for the notifier within this window
const SNAPSHOT_FRESH_HOURS: i64 = 24;

fn email_service(settings: &FloorlineSettings) -> EmailService {
    match (&settings.email.enabled, &settings.email.smtp) {
        (true, Some(smtp)) => EmailService::smtp(smtp).unwrap_or(EmailService::Disabled),
        _ => EmailService::disabled(),
    }
}

pub fn spawn_all(ctx: &AppContext, orchestrator: Arc<Orchestrator>) {
    spawn_reaper(orchestrator);
    spawn_stock_alerts(ctx.clone());
    spawn_daily_lifecycle(ctx.clone());
    spawn_edi_inbox_poll(ctx.clone());
}

fn spawn_reaper(orchestrator: Arc<Orchestrator>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REAPER_INTERVAL);
        loop {
            interval.tick().await;
            match orchestrator.reap_stale().await {
                Ok(0) => {}
                Ok(count) => tracing::warn!(count, "stale scrape jobs reaped"),
                Err(err) => tracing::error!(error = %err, "stale-job reaper failed"),
            }
        }
    });
}

fn spawn_stock_alerts(ctx: AppContext) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STOCK_ALERT_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = notify_stock_alerts(&ctx).await {
                tracing::error!(error = %err, "stock-alert notifier failed");
            }
        }
    });
}

/// Fires for (sku, email) pairs whose most recent fresh snapshot shows
/// stock, then marks the alert notified.
pub async fn notify_stock_alerts(ctx: &AppContext) -> Result<u64, sea_orm::DbErr> {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let email = email_service(&settings);
    let fresh_cutoff = Utc::now() - ChronoDuration::hours(SNAPSHOT_FRESH_HOURS);

    let pending = stock_alert::Entity::find()
        .filter(stock_alert::Column::Status.eq("pending"))
        .all(&ctx.db)
        .await?;

    let mut notified = 0;
    for alert in pending {
        let snapshot = inventory_snapshot::Entity::find()
            .filter(inventory_snapshot::Column::SkuId.eq(alert.sku_id))
            .filter(inventory_snapshot::Column::CapturedAt.gte(fresh_cutoff))
            .order_by_desc(inventory_snapshot::Column::CapturedAt)
            .one(&ctx.db)
            .await?;
        let Some(snapshot) = snapshot else { continue };
        if snapshot.qty_on_hand <= 0 {
            continue;
        }

        let product_name = match sku::Entity::find_by_id(alert.sku_id).one(&ctx.db).await? {
            Some(sku) => sku.vendor_sku,
            None => alert.sku_id.to_string(),
        };
        if let Err(err) = email.stock_alert(&alert.email, &product_name).await {
            tracing::warn!(error = %err, "stock alert email failed");
            continue;
        }

        let mut active: stock_alert::ActiveModel = alert.into();
        active.status = Set("notified".to_string());
        active.notified_at = Set(Some(Utc::now()));
        active.update(&ctx.db).await?;
        notified += 1;
    }
    if notified > 0 {
        tracing::info!(notified, "stock alerts sent");
    }
    Ok(notified)
}

fn spawn_daily_lifecycle(ctx: AppContext) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(until_next_daily_run()).await;
            if let Err(err) = run_daily_lifecycle(&ctx).await {
                tracing::error!(error = %err, "daily lifecycle run failed");
            }
        }
    });
}

fn until_next_daily_run() -> Duration {
    let now = Utc::now();
    let today_run = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), DAILY_HOUR_UTC, 0, 0)
        .single()
        .unwrap_or(now);
    let next = if today_run > now {
        today_run
    } else {
        today_run + ChronoDuration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::from_secs(3600))
}

/// The 6 AM UTC pass: renewal reminders at 30 days, lapse warnings at 15,
/// grace expiry at 0, plus session/2FA/quote cleanup.
pub async fn run_daily_lifecycle(ctx: &AppContext) -> loco_rs::Result<()> {
    let settings = FloorlineSettings::from_settings(&ctx.config.settings);
    let email = email_service(&settings);
    let gateway = StripeGateway::from_settings(&settings);
    let now = Utc::now();

    let subscribed = trade_customer::Entity::find()
        .filter(trade_customer::Column::StripeSubscriptionId.is_not_null())
        .all(&ctx.db)
        .await
        .map_err(loco_rs::Error::from)?;

    for trade in subscribed {
        let Some(expires_at) = trade.subscription_expires_at else {
            continue;
        };
        let days_left = (expires_at - now).num_days();
        match trade.subscription_status.as_deref() {
            Some("active") if (29..=30).contains(&days_left) => {
                if let Err(err) = email.subscription_renewal_reminder(&trade.email).await {
                    tracing::warn!(error = %err, "renewal reminder failed");
                }
            }
            Some("past_due") if (14..=15).contains(&days_left) => {
                if let Err(err) = email
                    .subscription_lapse_warning(&trade.email, days_left)
                    .await
                {
                    tracing::warn!(error = %err, "lapse warning failed");
                }
            }
            Some("past_due") if days_left < 0 => {
                // 30-day grace exhausted: cancel at the gateway, deactivate
                if let Some(subscription_id) = trade.stripe_subscription_id.clone() {
                    if let Err(err) = gateway.cancel_subscription(&subscription_id).await {
                        tracing::warn!(error = %err, "gateway subscription cancel failed");
                    }
                }
                let mut active: trade_customer::ActiveModel = trade.into();
                active.subscription_status = Set(Some("cancelled".to_string()));
                active.is_active = Set(false);
                active.updated_at = Set(Utc::now());
                active
                    .update(&ctx.db)
                    .await
                    .map_err(loco_rs::Error::from)?;
            }
            _ => {}
        }
    }

    let deleted = AuthService::new(ctx.db.clone())
        .cleanup_expired()
        .await
        .map_err(|e| loco_rs::Error::Message(e.to_string()))?;
    let expired_quotes = QuoteService::new(ctx.db.clone(), event_bus_from_context(ctx))
        .expire_due()
        .await
        .map_err(|e| loco_rs::Error::Message(e.to_string()))?;

    tracing::info!(deleted, expired_quotes, "daily lifecycle complete");
    Ok(())
}

fn spawn_edi_inbox_poll(ctx: AppContext) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EDI_POLL_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = poll_edi_inboxes(&ctx).await {
                tracing::error!(error = %err, "EDI inbox poll failed");
            }
        }
    });
}

/// Polls each EDI vendor's SFTP inbox for 855 acknowledgments and advances
/// matching POs. Unparseable files are left in place for a human.
pub async fn poll_edi_inboxes(ctx: &AppContext) -> loco_rs::Result<()> {
    use floorline_commerce::PurchaseOrderService;

    let vendors = vendor::Entity::find()
        .filter(vendor::Column::IsActive.eq(true))
        .all(&ctx.db)
        .await
        .map_err(loco_rs::Error::from)?;
    let pos = PurchaseOrderService::new(ctx.db.clone(), event_bus_from_context(ctx));

    for vendor in vendors.into_iter().filter(|v| v.edi_enabled()) {
        let Some(config) = vendor
            .edi_config
            .as_ref()
            .and_then(|c| c.get("sftp"))
            .cloned()
            .and_then(|c| serde_json::from_value::<SftpConfig>(c).ok())
        else {
            continue;
        };

        let files = {
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                let transport = SftpTransport::new(config);
                let names = transport.list_inbox()?;
                let mut docs = Vec::new();
                for name in names {
                    if name.ends_with(".855") {
                        let contents = transport.download(&name)?;
                        docs.push((name, contents));
                    }
                }
                Ok::<_, floorline_edi::EdiError>(docs)
            })
            .await
        };
        let files = match files {
            Ok(Ok(files)) => files,
            Ok(Err(err)) => {
                tracing::warn!(vendor = %vendor.name, error = %err, "EDI inbox unreachable");
                continue;
            }
            Err(err) => {
                tracing::warn!(vendor = %vendor.name, error = %err, "EDI inbox task failed");
                continue;
            }
        };

        for (name, contents) in files {
            match parse_855(&contents) {
                Ok(ack) if ack.accepted => {
                    match pos
                        .acknowledge_by_interchange(ack.interchange_control_number)
                        .await
                    {
                        Ok(Some(po_id)) => {
                            tracing::info!(%po_id, file = %name, "PO acknowledged via 855");
                            let config = config.clone();
                            let _ = tokio::task::spawn_blocking(move || {
                                SftpTransport::new(config).remove(&name)
                            })
                            .await;
                        }
                        Ok(None) => {
                            tracing::warn!(file = %name, "855 matched no purchase order")
                        }
                        Err(err) => tracing::warn!(file = %name, error = %err, "855 apply failed"),
                    }
                }
                Ok(_) => tracing::warn!(file = %name, "855 rejected by vendor"),
                Err(err) => tracing::warn!(file = %name, error = %err, "unparseable 855 left in inbox"),
            }
        }
    }
    Ok(())
}
