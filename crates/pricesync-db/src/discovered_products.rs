//! Database operations for `discovered_products`, the review queue.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use pricesync_core::{DiscoveredProduct, DiscoveryStatus, NewDiscovery};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, crawl_run_id, url, url_canonical, domain, page_title, \
     detected_price, status, reviewed_at, reviewed_by, created_at, updated_at";

/// A row from the `discovered_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscoveredProductRow {
    pub id: i64,
    /// `NULL` once the originating run has been deleted.
    pub crawl_run_id: Option<i64>,
    pub url: String,
    pub url_canonical: String,
    pub domain: String,
    pub page_title: Option<String>,
    pub detected_price: Option<Decimal>,
    pub status: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DiscoveredProductRow> for DiscoveredProduct {
    type Error = DbError;

    fn try_from(row: DiscoveredProductRow) -> Result<Self, Self::Error> {
        Ok(DiscoveredProduct {
            id: row.id,
            crawl_run_id: row.crawl_run_id,
            url: row.url,
            url_canonical: row.url_canonical,
            domain: row.domain,
            page_title: row.page_title,
            detected_price: row.detected_price.map(|p| p.to_string()),
            status: row.status.parse()?,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            created_at: row.created_at,
        })
    }
}

/// Parses a detected price for the `NUMERIC(12, 2)` column. An unparseable
/// price is stored as `NULL` rather than failing the whole write.
fn parse_price(raw: Option<&str>, url: &str) -> Option<Decimal> {
    let raw = raw?;
    match Decimal::from_str(raw) {
        Ok(mut price) => {
            price.rescale(2);
            Some(price)
        }
        Err(e) => {
            tracing::warn!(url, price = raw, error = %e, "discarding unparseable detected price");
            None
        }
    }
}

/// Inserts a new discovery or refreshes an existing one, keyed by
/// `url_canonical`.
///
/// On conflict `crawl_run_id` always moves to `run_id`; `page_title` and
/// `detected_price` are replaced only by non-null values; `status` and the
/// review fields are left alone. Returns the row id.
///
/// # Errors
///
/// Returns [`DbError::RunNotFound`] if `run_id` does not exist, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_discovered_product(
    pool: &PgPool,
    run_id: i64,
    discovery: &NewDiscovery,
) -> Result<i64, DbError> {
    let price = parse_price(discovery.detected_price.as_deref(), &discovery.url_canonical);

    sqlx::query_scalar::<_, i64>(
        "INSERT INTO discovered_products \
             (crawl_run_id, url, url_canonical, domain, page_title, detected_price) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (url_canonical) DO UPDATE SET \
             crawl_run_id = EXCLUDED.crawl_run_id, \
             page_title = COALESCE(EXCLUDED.page_title, discovered_products.page_title), \
             detected_price = COALESCE(EXCLUDED.detected_price, discovered_products.detected_price), \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(run_id)
    .bind(&discovery.url)
    .bind(&discovery.url_canonical)
    .bind(&discovery.domain)
    .bind(&discovery.page_title)
    .bind(price)
    .fetch_one(pool)
    .await
    .map_err(|e| run_reference_error(e, run_id))
}

/// Maps a foreign-key violation on `crawl_run_id` to [`DbError::RunNotFound`].
pub(crate) fn run_reference_error(err: sqlx::Error, run_id: i64) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => DbError::RunNotFound(run_id),
        _ => DbError::Sqlx(err),
    }
}

/// Review action: sets `status`, stamps `reviewed_at = NOW()` and records
/// the reviewer. Any transition is allowed.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_discovery_status(
    pool: &PgPool,
    id: i64,
    status: DiscoveryStatus,
    reviewed_by: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE discovered_products \
         SET status = $1, reviewed_at = NOW(), reviewed_by = $2, updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(status.as_str())
    .bind(reviewed_by)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Fetches one discovered product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_discovered_product(
    pool: &PgPool,
    id: i64,
) -> Result<DiscoveredProductRow, DbError> {
    sqlx::query_as::<_, DiscoveredProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM discovered_products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Lists discovered products, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_discovered_products(
    pool: &PgPool,
    status: Option<DiscoveryStatus>,
    limit: i64,
) -> Result<Vec<DiscoveredProductRow>, DbError> {
    let rows = sqlx::query_as::<_, DiscoveredProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM discovered_products \
         WHERE ($1::TEXT IS NULL OR status = $1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(status.map(DiscoveryStatus::as_str))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
