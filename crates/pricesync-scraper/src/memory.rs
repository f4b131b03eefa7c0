//! In-memory implementations of the inventory and ledger contracts.
//!
//! Used by `discover run --dry-run` and by tests. Semantics mirror the
//! Postgres store: upsert by canonical URL, non-null metadata overwrite,
//! untouched review fields, one running run per site.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use pricesync_core::{
    CrawlRun, CrawlRunStatus, DiscoveredProduct, DiscoveryStatus, InventorySource, LedgerSink,
    NewDiscovery, OfferObservation, RunCounts, StoreError,
};

/// A fixed catalog snapshot source.
#[derive(Debug, Clone, Default)]
pub struct MemoryInventory {
    urls: HashSet<String>,
    skus: HashSet<String>,
}

impl MemoryInventory {
    pub fn new<U, S>(urls: U, skus: S) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            skus: skus.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl InventorySource for MemoryInventory {
    async fn load_canonical_urls(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.urls.clone())
    }

    async fn load_skus(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.skus.clone())
    }
}

/// An offer as last observed, with its sighting history.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOffer {
    pub id: i64,
    pub crawl_run_id: i64,
    pub observation: OfferObservation,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub sightings: u32,
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: i64,
    runs: BTreeMap<i64, CrawlRun>,
    products: BTreeMap<String, DiscoveredProduct>,
    offers: BTreeMap<String, RecordedOffer>,
}

impl LedgerState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn running_run(&mut self, run_id: i64) -> Result<&mut CrawlRun, StoreError> {
        let run = self
            .runs
            .get_mut(&run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;
        if run.status == CrawlRunStatus::Running {
            Ok(run)
        } else {
            Err(StoreError::RunNotRunning(run_id))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn run(&self, run_id: i64) -> Option<CrawlRun> {
        self.lock().runs.get(&run_id).cloned()
    }

    #[must_use]
    pub fn runs(&self) -> Vec<CrawlRun> {
        self.lock().runs.values().cloned().collect()
    }

    /// Discovered products ordered by canonical URL.
    #[must_use]
    pub fn products(&self) -> Vec<DiscoveredProduct> {
        self.lock().products.values().cloned().collect()
    }

    #[must_use]
    pub fn product(&self, url_canonical: &str) -> Option<DiscoveredProduct> {
        self.lock().products.get(url_canonical).cloned()
    }

    /// Offers ordered by offer URL.
    #[must_use]
    pub fn offers(&self) -> Vec<RecordedOffer> {
        self.lock().offers.values().cloned().collect()
    }
}

impl LedgerSink for MemoryLedger {
    async fn start_run(&self, sites: &[String]) -> Result<i64, StoreError> {
        let mut state = self.lock();
        let requested: HashSet<&String> = sites.iter().collect();
        let busy: Vec<String> = state
            .runs
            .values()
            .filter(|run| run.status == CrawlRunStatus::Running)
            .flat_map(|run| run.sites_crawled.iter())
            .filter(|site| requested.contains(site))
            .cloned()
            .collect();
        if !busy.is_empty() {
            return Err(StoreError::RunInProgress { sites: busy });
        }

        let id = state.next_id();
        state.runs.insert(
            id,
            CrawlRun {
                id,
                started_at: Utc::now(),
                completed_at: None,
                status: CrawlRunStatus::Running,
                sites_crawled: sites.to_vec(),
                counts: RunCounts::default(),
                error_message: None,
            },
        );
        Ok(id)
    }

    async fn complete_run(&self, run_id: i64, counts: RunCounts) -> Result<(), StoreError> {
        let mut state = self.lock();
        let run = state.running_run(run_id)?;
        run.status = CrawlRunStatus::Completed;
        run.completed_at = Some(Utc::now());
        run.counts = counts;
        Ok(())
    }

    async fn fail_run(&self, run_id: i64, error_message: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        let run = state.running_run(run_id)?;
        run.status = CrawlRunStatus::Failed;
        run.completed_at = Some(Utc::now());
        run.error_message = Some(error_message.to_string());
        Ok(())
    }

    async fn record_discovery(
        &self,
        run_id: i64,
        discovery: &NewDiscovery,
    ) -> Result<i64, StoreError> {
        let mut state = self.lock();
        if !state.runs.contains_key(&run_id) {
            return Err(StoreError::RunNotFound(run_id));
        }

        if let Some(existing) = state.products.get_mut(&discovery.url_canonical) {
            existing.crawl_run_id = Some(run_id);
            if let Some(title) = &discovery.page_title {
                existing.page_title = Some(title.clone());
            }
            if let Some(price) = &discovery.detected_price {
                existing.detected_price = Some(price.clone());
            }
            return Ok(existing.id);
        }

        let id = state.next_id();
        state.products.insert(
            discovery.url_canonical.clone(),
            DiscoveredProduct {
                id,
                crawl_run_id: Some(run_id),
                url: discovery.url.clone(),
                url_canonical: discovery.url_canonical.clone(),
                domain: discovery.domain.clone(),
                page_title: discovery.page_title.clone(),
                detected_price: discovery.detected_price.clone(),
                status: DiscoveryStatus::Pending,
                reviewed_at: None,
                reviewed_by: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn record_offer(
        &self,
        run_id: i64,
        offer: &OfferObservation,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if !state.runs.contains_key(&run_id) {
            return Err(StoreError::RunNotFound(run_id));
        }
        let now = Utc::now();

        if let Some(existing) = state.offers.get_mut(&offer.offer_url) {
            let previous = std::mem::replace(&mut existing.observation, offer.clone());
            let current = &mut existing.observation;
            current.title = current.title.take().or(previous.title);
            current.summary = current.summary.take().or(previous.summary);
            current.starts_on = current.starts_on.or(previous.starts_on);
            current.ends_on = current.ends_on.or(previous.ends_on);
            existing.crawl_run_id = run_id;
            existing.last_seen_at = now;
            existing.sightings += 1;
            return Ok(false);
        }

        let id = state.next_id();
        let mut observation = offer.clone();
        observation
            .title
            .get_or_insert_with(|| offer.offer_url.clone());
        state.offers.insert(
            offer.offer_url.clone(),
            RecordedOffer {
                id,
                crawl_run_id: run_id,
                observation,
                first_seen_at: now,
                last_seen_at: now,
                sightings: 1,
            },
        );
        Ok(true)
    }

    async fn set_status(
        &self,
        discovery_id: i64,
        status: DiscoveryStatus,
        reviewed_by: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let product = state
            .products
            .values_mut()
            .find(|p| p.id == discovery_id)
            .ok_or(StoreError::DiscoveryNotFound(discovery_id))?;
        product.status = status;
        product.reviewed_at = Some(Utc::now());
        product.reviewed_by = reviewed_by.map(str::to_string);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
