//! Database operations for the `crawl_runs` ledger.
//!
//! A run is inserted `running` and moved exactly once to `completed` or
//! `failed`. Every terminal update is guarded by `status = 'running'`, so a
//! second terminal write is rejected instead of overwriting the first.

use chrono::{DateTime, Duration, Utc};
use pricesync_core::{CrawlRun, RunCounts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Error message written by [`reconcile_stale_runs`].
pub const STALE_RUN_MESSAGE: &str = "run abandoned: still running past the stale-run cutoff";

// Serializes run creation so two concurrent starts cannot both pass the
// overlap check. Arbitrary but fixed.
const START_RUN_LOCK_KEY: i64 = 0x7072_6963_6573_796e;

const RUN_COLUMNS: &str = "id, public_id, status, sites_crawled, urls_discovered, \
     new_products_found, new_offers_found, error_message, started_at, completed_at, created_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `crawl_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CrawlRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub status: String,
    pub sites_crawled: Vec<String>,
    pub urls_discovered: i32,
    pub new_products_found: i32,
    pub new_offers_found: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CrawlRunRow> for CrawlRun {
    type Error = DbError;

    fn try_from(row: CrawlRunRow) -> Result<Self, Self::Error> {
        Ok(CrawlRun {
            id: row.id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            status: row.status.parse()?,
            sites_crawled: row.sites_crawled,
            counts: RunCounts {
                urls_discovered: row.urls_discovered,
                new_products_found: row.new_products_found,
                new_offers_found: row.new_offers_found,
            },
            error_message: row.error_message,
        })
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates a run in `running` status covering `sites`.
///
/// The overlap check and the insert run in one transaction holding an
/// advisory lock, so at most one running run ever covers a given site.
///
/// # Errors
///
/// Returns [`DbError::RunInProgress`] listing the busy sites when another
/// running run already covers one of `sites`, or [`DbError::Sqlx`] if a
/// query fails.
pub async fn start_crawl_run(pool: &PgPool, sites: &[String]) -> Result<CrawlRunRow, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(START_RUN_LOCK_KEY)
        .execute(&mut *tx)
        .await?;

    let busy: Vec<String> = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT site \
         FROM crawl_runs, UNNEST(sites_crawled) AS site \
         WHERE status = 'running' AND site = ANY($1) \
         ORDER BY site",
    )
    .bind(sites)
    .fetch_all(&mut *tx)
    .await?;

    if !busy.is_empty() {
        return Err(DbError::RunInProgress { sites: busy });
    }

    let row = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "INSERT INTO crawl_runs (public_id, status, sites_crawled) \
         VALUES ($1, 'running', $2) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(sites)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Marks a run `completed` and writes its final counts.
///
/// # Errors
///
/// Returns [`DbError::RunNotFound`] for an unknown id,
/// [`DbError::InvalidRunTransition`] if the run is no longer running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_crawl_run(
    pool: &PgPool,
    id: i64,
    counts: RunCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = 'completed', completed_at = NOW(), \
             urls_discovered = $1, new_products_found = $2, new_offers_found = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(counts.urls_discovered)
    .bind(counts.new_products_found)
    .bind(counts.new_offers_found)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(missing_or_finished(pool, id).await);
    }
    Ok(())
}

/// Marks a run `failed` with `error_message`.
///
/// # Errors
///
/// Same as [`complete_crawl_run`].
pub async fn fail_crawl_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(missing_or_finished(pool, id).await);
    }
    Ok(())
}

async fn missing_or_finished(pool: &PgPool, id: i64) -> DbError {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM crawl_runs WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await;
    match exists {
        Ok(true) => DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        },
        Ok(false) => DbError::RunNotFound(id),
        Err(e) => DbError::Sqlx(e),
    }
}

/// Fetches a single run by id.
///
/// # Errors
///
/// Returns [`DbError::RunNotFound`] if no row exists, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_crawl_run(pool: &PgPool, id: i64) -> Result<CrawlRunRow, DbError> {
    sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::RunNotFound(id))
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_crawl_runs(pool: &PgPool, limit: i64) -> Result<Vec<CrawlRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Marks every run still `running` that started more than `older_than` ago
/// as `failed` with [`STALE_RUN_MESSAGE`]. Returns the ids it touched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn reconcile_stale_runs(pool: &PgPool, older_than: Duration) -> Result<Vec<i64>, DbError> {
    let cutoff = Utc::now() - older_than;
    let ids = sqlx::query_scalar::<_, i64>(
        "UPDATE crawl_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE status = 'running' AND started_at < $2 \
         RETURNING id",
    )
    .bind(STALE_RUN_MESSAGE)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    if !ids.is_empty() {
        tracing::warn!(count = ids.len(), ?ids, %cutoff, "reconciled stale crawl runs");
    }
    Ok(ids)
}
