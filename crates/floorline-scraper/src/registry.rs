use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::entities::{scrape_job, vendor_source};
use crate::pools::PoolKind;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    pub products_found: i32,
    pub products_updated: i32,
}

/// A scraper module. The orchestrator promises to call exactly one module
/// per job and to update the job row from the outcome; modules must honor
/// the cancellation token at their own granularity.
#[async_trait]
pub trait Scraper: Send + Sync {
    fn key(&self) -> &'static str;

    /// Which concurrency pool the module competes in. Non-browser modules
    /// return [`PoolKind::None`] and pass through without taking a slot.
    fn pool(&self) -> PoolKind;

    async fn run(
        &self,
        db: &DatabaseConnection,
        job: &scrape_job::Model,
        source: &vendor_source::Model,
        cancel: CancellationToken,
    ) -> Result<ScrapeStats, String>;
}

#[derive(Clone, Default)]
pub struct ScraperRegistry {
    modules: HashMap<&'static str, Arc<dyn Scraper>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, scraper: Arc<dyn Scraper>) -> Self {
        self.modules.insert(scraper.key(), scraper);
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Scraper>> {
        self.modules.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.modules.keys().copied().collect()
    }
}
