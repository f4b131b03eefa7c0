//! Database operations for `offers`.

use chrono::{DateTime, NaiveDate, Utc};
use pricesync_core::OfferObservation;
use sqlx::PgPool;

use crate::discovered_products::run_reference_error;
use crate::DbError;

/// A row from the `offers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfferRow {
    pub id: i64,
    pub crawl_run_id: Option<i64>,
    pub domain: String,
    pub title: String,
    pub summary: Option<String>,
    pub offer_url: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub sightings: i32,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Result of [`upsert_offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct OfferUpsert {
    pub id: i64,
    /// `true` when the row did not exist before this call.
    pub inserted: bool,
}

/// Records a sighting of an offer, keyed by `offer_url`.
///
/// A repeat sighting bumps `last_seen_at` and `sightings`, replaces the
/// title, and keeps the previous summary and dates when the new ones are
/// missing.
///
/// # Errors
///
/// Returns [`DbError::RunNotFound`] if `run_id` does not exist, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_offer(
    pool: &PgPool,
    run_id: i64,
    offer: &OfferObservation,
) -> Result<OfferUpsert, DbError> {
    // An untitled first sighting is titled by its URL; an untitled repeat
    // keeps the stored title. xmax is 0 only for a freshly inserted tuple.
    sqlx::query_as::<_, OfferUpsert>(
        "INSERT INTO offers (crawl_run_id, domain, title, summary, offer_url, starts_on, ends_on) \
         VALUES ($1, $2, COALESCE($3, $5), $4, $5, $6, $7) \
         ON CONFLICT (offer_url) DO UPDATE SET \
             crawl_run_id = EXCLUDED.crawl_run_id, \
             title = COALESCE($3, offers.title), \
             summary = COALESCE(EXCLUDED.summary, offers.summary), \
             starts_on = COALESCE(EXCLUDED.starts_on, offers.starts_on), \
             ends_on = COALESCE(EXCLUDED.ends_on, offers.ends_on), \
             sightings = offers.sightings + 1, \
             last_seen_at = NOW() \
         RETURNING id, (xmax = 0) AS inserted",
    )
    .bind(run_id)
    .bind(&offer.domain)
    .bind(&offer.title)
    .bind(&offer.summary)
    .bind(&offer.offer_url)
    .bind(offer.starts_on)
    .bind(offer.ends_on)
    .fetch_one(pool)
    .await
    .map_err(|e| run_reference_error(e, run_id))
}

/// Lists offers by most recent sighting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_offers(pool: &PgPool, limit: i64) -> Result<Vec<OfferRow>, DbError> {
    let rows = sqlx::query_as::<_, OfferRow>(
        "SELECT id, crawl_run_id, domain, title, summary, offer_url, starts_on, ends_on, \
                sightings, first_seen_at, last_seen_at \
         FROM offers \
         ORDER BY last_seen_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
