//! Contracts between the discovery core and whatever persists its results.
//!
//! The crawler and matcher never talk to a database directly. They take an
//! [`InventorySource`] to build the matching snapshot and a [`LedgerSink`]
//! to record runs, discoveries, and offers. Postgres and in-memory
//! implementations live in the `pricesync-db` and `pricesync-scraper`
//! crates respectively.

use std::collections::HashSet;
use std::future::Future;

use thiserror::Error;

use crate::discovery::{DiscoveryStatus, NewDiscovery, OfferObservation, RunCounts};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("crawl run {0} not found")]
    RunNotFound(i64),

    #[error("crawl run {0} is not in running status")]
    RunNotRunning(i64),

    #[error("a crawl run is already in progress for: {}", .sites.join(", "))]
    RunInProgress { sites: Vec<String> },

    #[error("discovered product {0} not found")]
    DiscoveryNotFound(i64),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps any backend error (database, I/O) as [`StoreError::Backend`].
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Read access to the existing catalog, loaded once per matching pass.
pub trait InventorySource: Send + Sync {
    /// Supplier URLs of every tracked product. Callers canonicalize them.
    fn load_canonical_urls(
        &self,
    ) -> impl Future<Output = Result<HashSet<String>, StoreError>> + Send;

    /// SKUs of every tracked product, in whatever case the catalog stores.
    fn load_skus(&self) -> impl Future<Output = Result<HashSet<String>, StoreError>> + Send;
}

/// Write side of the discovery run ledger plus the review action.
pub trait LedgerSink: Send + Sync {
    /// Creates a run in `running` status and returns its id.
    ///
    /// Fails with [`StoreError::RunInProgress`] when another running run
    /// already covers one of `sites`.
    fn start_run(&self, sites: &[String]) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Writes final counts and `completed` status.
    fn complete_run(
        &self,
        run_id: i64,
        counts: RunCounts,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Writes `failed` status and the error message.
    fn fail_run(
        &self,
        run_id: i64,
        error_message: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Upserts a new-product discovery keyed by `url_canonical`.
    ///
    /// On conflict only `crawl_run_id` is always updated; `page_title` and
    /// `detected_price` are overwritten only by non-null values, and the
    /// review fields are never touched. Returns the row id.
    fn record_discovery(
        &self,
        run_id: i64,
        discovery: &NewDiscovery,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Upserts an offer keyed by `offer_url` and bumps `last_seen_at`.
    /// Returns `true` when the offer was seen for the first time.
    fn record_offer(
        &self,
        run_id: i64,
        offer: &OfferObservation,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Review action: moves a discovered product to any status.
    fn set_status(
        &self,
        discovery_id: i64,
        status: DiscoveryStatus,
        reviewed_by: Option<&str>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
