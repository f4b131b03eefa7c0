//! Postgres persistence for crawl runs, the discovery review queue, offers
//! and the tracked inventory.
//!
//! Pool sizing comes from [`AppConfig`]; there is no second environment
//! lookup in this crate.

use std::collections::HashSet;
use std::time::Duration;

use pricesync_core::{AppConfig, CoreError};
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

// Relative to this crate's manifest: the workspace-level migrations/ directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Connection pool sizing, taken from the loaded [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }

    fn pool_options(self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }
}

impl From<&AppConfig> for PoolConfig {
    fn from(config: &AppConfig) -> Self {
        Self::from_app_config(config)
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("discovered product not found")]
    NotFound,
    #[error("crawl run {0} not found")]
    RunNotFound(i64),
    #[error("crawl run {id} is not in {expected_status} status")]
    InvalidRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error("a crawl run is already in progress for: {}", .sites.join(", "))]
    RunInProgress { sites: Vec<String> },
    #[error("unreadable row: {0}")]
    Row(#[from] CoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Opens a pool against `database_url` sized by `config`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if no connection can be established within the
/// acquire timeout.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    let pool = config.pool_options().connect(database_url).await?;
    tracing::debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Applies every pending migration and returns how many were new.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if a migration fails or the
/// recorded history disagrees with the files on disk.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_versions(pool).await;
    MIGRATOR.run(pool).await?;
    let applied = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !before.contains(&m.version))
        .count();
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }
    Ok(applied)
}

// A fresh database has no _sqlx_migrations table yet; that reads as empty.
async fn applied_versions(pool: &PgPool) -> HashSet<i64> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await
        .map(|versions| versions.into_iter().collect())
        .unwrap_or_default()
}

/// Round-trips `SELECT 1` to confirm the pool can reach the database.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}


pub mod crawl_runs;
pub mod discovered_products;
pub mod inventory;
pub mod offers;
pub mod store;

pub use crawl_runs::{
    complete_crawl_run, fail_crawl_run, get_crawl_run, list_crawl_runs, reconcile_stale_runs,
    start_crawl_run, CrawlRunRow, STALE_RUN_MESSAGE,
};
pub use discovered_products::{
    get_discovered_product, list_discovered_products, set_discovery_status,
    upsert_discovered_product, DiscoveredProductRow,
};
pub use inventory::{
    list_tracked_skus, list_tracked_supplier_urls, upsert_tracked_product, NewTrackedProduct,
    TrackedProductRow,
};
pub use offers::{list_offers, upsert_offer, OfferRow, OfferUpsert};
pub use store::PgStore;
