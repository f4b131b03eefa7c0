use anyhow::Context;
use pricesync_core::{DiscoveryStatus, LedgerSink, StoreError};
use pricesync_db::PgStore;

use super::{fmt_time, truncate};

/// Show recent crawl runs, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_discover_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = pricesync_db::list_crawl_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no crawl runs yet; run `discover run` first");
        return Ok(());
    }

    println!(
        "{:<7}{:<11}{:<18}{:<18}{:>6}{:>6}{:>7}  SITES",
        "ID", "STATUS", "STARTED", "COMPLETED", "URLS", "NEW", "OFFERS"
    );
    for run in &runs {
        println!(
            "{:<7}{:<11}{:<18}{:<18}{:>6}{:>6}{:>7}  {}",
            run.id,
            run.status,
            fmt_time(Some(run.started_at)),
            fmt_time(run.completed_at),
            run.urls_discovered,
            run.new_products_found,
            run.new_offers_found,
            run.sites_crawled.join(",")
        );
        if let Some(message) = &run.error_message {
            println!("       error: {}", truncate(message, 100));
        }
    }

    Ok(())
}

/// Show discovered products still awaiting review.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_discover_pending(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let rows =
        pricesync_db::list_discovered_products(pool, Some(DiscoveryStatus::Pending), limit).await?;
    if rows.is_empty() {
        println!("review queue is empty");
        return Ok(());
    }

    println!("{:<7}{:<20}{:<12}{:<50}TITLE", "ID", "DOMAIN", "PRICE", "URL");
    for row in &rows {
        println!(
            "{:<7}{:<20}{:<12}{:<50}{}",
            row.id,
            truncate(&row.domain, 17),
            row.detected_price
                .map_or_else(|| "\u{2014}".to_string(), |p| p.to_string()),
            truncate(&row.url_canonical, 47),
            row.page_title
                .as_deref()
                .map_or(String::new(), |t| truncate(t, 40))
        );
    }

    Ok(())
}

/// Review action: move a discovered product to `status`.
///
/// # Errors
///
/// Returns an error if `status` is not one of the four known values, the
/// product does not exist, or the update fails.
pub(crate) async fn run_discover_review(
    pool: &sqlx::PgPool,
    id: i64,
    status: &str,
    reviewer: Option<&str>,
) -> anyhow::Result<()> {
    let status: DiscoveryStatus = status.parse()?;
    let store = PgStore::new(pool.clone());

    match store.set_status(id, status, reviewer).await {
        Ok(()) => {
            println!("discovered product {id} marked {status}");
            Ok(())
        }
        Err(StoreError::DiscoveryNotFound(_)) => {
            anyhow::bail!("discovered product {id} not found; see `discover pending`")
        }
        Err(e) => Err(e).context("failed to update review status"),
    }
}

/// Mark runs stuck in `running` for longer than `older_than_mins` as failed.
///
/// # Errors
///
/// Returns an error if the update fails.
pub(crate) async fn run_discover_reconcile(
    pool: &sqlx::PgPool,
    older_than_mins: u32,
) -> anyhow::Result<()> {
    let older_than = chrono::Duration::minutes(i64::from(older_than_mins));
    let ids = pricesync_db::reconcile_stale_runs(pool, older_than).await?;
    if ids.is_empty() {
        println!("no stale runs");
    } else {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        println!("marked {} run(s) failed: {}", ids.len(), ids.join(", "));
    }
    Ok(())
}
