//! [`PgStore`]: the Postgres implementation of the discovery contracts.

use std::collections::HashSet;

use pricesync_core::{
    DiscoveryStatus, InventorySource, LedgerSink, NewDiscovery, OfferObservation, RunCounts,
    StoreError,
};
use sqlx::PgPool;

use crate::{crawl_runs, discovered_products, inventory, offers, DbError};

/// Inventory source and run ledger backed by one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a database error onto the contract error. `NotFound` only arises
/// from the review action, so it always means a missing discovery.
fn to_store_error(err: DbError, discovery_id: Option<i64>) -> StoreError {
    match err {
        DbError::RunNotFound(id) => StoreError::RunNotFound(id),
        DbError::InvalidRunTransition { id, .. } => StoreError::RunNotRunning(id),
        DbError::RunInProgress { sites } => StoreError::RunInProgress { sites },
        DbError::NotFound => match discovery_id {
            Some(id) => StoreError::DiscoveryNotFound(id),
            None => StoreError::backend(DbError::NotFound),
        },
        other => StoreError::backend(other),
    }
}

impl InventorySource for PgStore {
    async fn load_canonical_urls(&self) -> Result<HashSet<String>, StoreError> {
        let urls = inventory::list_tracked_supplier_urls(&self.pool)
            .await
            .map_err(|e| to_store_error(e, None))?;
        Ok(urls.into_iter().collect())
    }

    async fn load_skus(&self) -> Result<HashSet<String>, StoreError> {
        let skus = inventory::list_tracked_skus(&self.pool)
            .await
            .map_err(|e| to_store_error(e, None))?;
        Ok(skus.into_iter().collect())
    }
}

impl LedgerSink for PgStore {
    async fn start_run(&self, sites: &[String]) -> Result<i64, StoreError> {
        let row = crawl_runs::start_crawl_run(&self.pool, sites)
            .await
            .map_err(|e| to_store_error(e, None))?;
        tracing::debug!(run_id = row.id, public_id = %row.public_id, "crawl run row created");
        Ok(row.id)
    }

    async fn complete_run(&self, run_id: i64, counts: RunCounts) -> Result<(), StoreError> {
        crawl_runs::complete_crawl_run(&self.pool, run_id, counts)
            .await
            .map_err(|e| to_store_error(e, None))
    }

    async fn fail_run(&self, run_id: i64, error_message: &str) -> Result<(), StoreError> {
        crawl_runs::fail_crawl_run(&self.pool, run_id, error_message)
            .await
            .map_err(|e| to_store_error(e, None))
    }

    async fn record_discovery(
        &self,
        run_id: i64,
        discovery: &NewDiscovery,
    ) -> Result<i64, StoreError> {
        discovered_products::upsert_discovered_product(&self.pool, run_id, discovery)
            .await
            .map_err(|e| to_store_error(e, None))
    }

    async fn record_offer(
        &self,
        run_id: i64,
        offer: &OfferObservation,
    ) -> Result<bool, StoreError> {
        let upsert = offers::upsert_offer(&self.pool, run_id, offer)
            .await
            .map_err(|e| to_store_error(e, None))?;
        Ok(upsert.inserted)
    }

    async fn set_status(
        &self,
        discovery_id: i64,
        status: DiscoveryStatus,
        reviewed_by: Option<&str>,
    ) -> Result<(), StoreError> {
        discovered_products::set_discovery_status(&self.pool, discovery_id, status, reviewed_by)
            .await
            .map_err(|e| to_store_error(e, Some(discovery_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_errors_map_to_contract_variants() {
        assert!(matches!(
            to_store_error(DbError::RunNotFound(4), None),
            StoreError::RunNotFound(4)
        ));
        assert!(matches!(
            to_store_error(
                DbError::InvalidRunTransition {
                    id: 4,
                    expected_status: "running"
                },
                None
            ),
            StoreError::RunNotRunning(4)
        ));
        assert!(matches!(
            to_store_error(
                DbError::RunInProgress {
                    sites: vec!["honda-marine".to_string()]
                },
                None
            ),
            StoreError::RunInProgress { ref sites } if sites == &["honda-marine".to_string()]
        ));
    }

    #[test]
    fn not_found_maps_to_discovery_only_with_an_id() {
        assert!(matches!(
            to_store_error(DbError::NotFound, Some(9)),
            StoreError::DiscoveryNotFound(9)
        ));
        assert!(matches!(
            to_store_error(DbError::NotFound, None),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn other_errors_are_boxed_as_backend() {
        let err = to_store_error(
            DbError::Row(pricesync_core::CoreError::UnknownRunStatus("queued".to_string())),
            None,
        );
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.to_string().contains("queued"));
    }
}
