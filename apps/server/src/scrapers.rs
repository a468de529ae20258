//! Scraper module registrations. Vendor-specific browser scrapers register
//! here as they land; the generic feed scraper covers vendors that publish
//! a JSON inventory feed and needs no browser slot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use floorline_commerce::entities::{inventory_snapshot, sku};
use floorline_core::generate_id;
use floorline_scraper::entities::{scrape_job, vendor_source};
use floorline_scraper::{PoolKind, ScrapeStats, Scraper, ScraperRegistry};

pub fn build_registry() -> ScraperRegistry {
    ScraperRegistry::new().register(Arc::new(InventoryFeedScraper::default()))
}

#[derive(Deserialize)]
struct FeedRow {
    vendor_sku: String,
    qty_on_hand: i32,
    #[serde(default)]
    cost: Option<Decimal>,
}

/// Pulls a vendor's JSON inventory feed and lands one snapshot per SKU.
#[derive(Default)]
pub struct InventoryFeedScraper {
    http: reqwest::Client,
}

#[async_trait]
impl Scraper for InventoryFeedScraper {
    fn key(&self) -> &'static str {
        "inventory-feed"
    }

    fn pool(&self) -> PoolKind {
        PoolKind::None
    }

    async fn run(
        &self,
        db: &DatabaseConnection,
        _job: &scrape_job::Model,
        source: &vendor_source::Model,
        cancel: CancellationToken,
    ) -> Result<ScrapeStats, String> {
        let feed_url = source
            .config
            .get("feed_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "source config is missing feed_url".to_string())?;

        let rows: Vec<FeedRow> = self
            .http
            .get(feed_url)
            .send()
            .await
            .map_err(|e| format!("feed fetch failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("feed parse failed: {e}"))?;

        let mut stats = ScrapeStats::default();
        for row in rows {
            if cancel.is_cancelled() {
                return Err("cancelled".to_string());
            }
            stats.products_found += 1;
            let Some(sku) = sku::Entity::find()
                .filter(sku::Column::VendorSku.eq(row.vendor_sku.clone()))
                .one(db)
                .await
                .map_err(|e| e.to_string())?
            else {
                continue;
            };

            inventory_snapshot::ActiveModel {
                id: Set(generate_id()),
                sku_id: Set(sku.id),
                qty_on_hand: Set(row.qty_on_hand),
                captured_at: Set(Utc::now()),
            }
            .insert(db)
            .await
            .map_err(|e| e.to_string())?;

            if let Some(cost) = row.cost {
                if cost != sku.cost {
                    let mut active: sku::ActiveModel = sku.into();
                    active.cost = Set(cost);
                    active.updated_at = Set(Utc::now());
                    active.update(db).await.map_err(|e| e.to_string())?;
                }
            }
            stats.products_updated += 1;
        }
        Ok(stats)
    }
}
