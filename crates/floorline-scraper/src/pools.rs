//! Two bounded pools: catalog/pricing/inventory scrapers hold browser
//! sessions and compete for one, brand-enrichment scrapers for the other.
//! A semaphore permit is the slot; dropping it — on success, error, or
//! panic — releases the slot and wakes the next queued acquirer in FIFO
//! order.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_CATALOG_SLOTS: usize = 2;
pub const DEFAULT_ENRICHMENT_SLOTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolKind {
    Catalog,
    Enrichment,
    /// non-browser modules pass through without a slot
    None,
}

#[derive(Clone)]
pub struct Pools {
    catalog: Arc<Semaphore>,
    enrichment: Arc<Semaphore>,
}

impl Default for Pools {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_SLOTS, DEFAULT_ENRICHMENT_SLOTS)
    }
}

impl Pools {
    pub fn new(catalog_slots: usize, enrichment_slots: usize) -> Self {
        Self {
            catalog: Arc::new(Semaphore::new(catalog_slots)),
            enrichment: Arc::new(Semaphore::new(enrichment_slots)),
        }
    }

    pub async fn acquire(&self, kind: PoolKind) -> Option<OwnedSemaphorePermit> {
        let semaphore = match kind {
            PoolKind::Catalog => self.catalog.clone(),
            PoolKind::Enrichment => self.enrichment.clone(),
            PoolKind::None => return None,
        };
        // acquire_owned only fails if the semaphore is closed, which we never do
        Some(
            semaphore
                .acquire_owned()
                .await
                .expect("scraper pool semaphore closed"),
        )
    }

    pub fn available(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Catalog => self.catalog.available_permits(),
            PoolKind::Enrichment => self.enrichment.available_permits(),
            PoolKind::None => usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slots_release_on_drop() {
        let pools = Pools::new(1, 1);
        let permit = pools.acquire(PoolKind::Catalog).await;
        assert_eq!(pools.available(PoolKind::Catalog), 0);
        drop(permit);
        assert_eq!(pools.available(PoolKind::Catalog), 1);
    }

    #[tokio::test]
    async fn queued_acquirer_resolves_when_slot_frees() {
        let pools = Pools::new(1, 1);
        let held = pools.acquire(PoolKind::Catalog).await;

        let pools2 = pools.clone();
        let waiter = tokio::spawn(async move { pools2.acquire(PoolKind::Catalog).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let permit = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resolve once the slot frees")
            .unwrap();
        assert!(permit.is_some());
    }

    #[tokio::test]
    async fn non_browser_modules_pass_through() {
        let pools = Pools::new(0, 0);
        assert!(pools.acquire(PoolKind::None).await.is_none());
    }
}
