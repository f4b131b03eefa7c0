//! Crawl, match, and record: one discovery run end to end.
//!
//! Every run that starts ends with exactly one terminal ledger write. The
//! body runs under `catch_unwind`, so a panic in crawling, matching, or
//! recording still marks the run `failed`.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use pricesync_core::{
    InventorySource, LedgerSink, NewDiscovery, OfferObservation, RunCounts, SiteConfig,
};

use crate::crawler::Crawler;
use crate::error::DiscoveryError;
use crate::fetch::PageFetcher;
use crate::frontier::SiteSummary;
use crate::matcher::{classify_discoveries, InventorySnapshot, MatchPolicy};

/// Outcome of a completed discovery run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: i64,
    pub counts: RunCounts,
    pub sites: Vec<SiteSummary>,
    /// Product candidates recognised as already tracked.
    pub existing_products: usize,
    /// New discoveries or offers whose ledger write failed.
    pub record_failures: usize,
}

/// Runs discovery for `sites` and records the results in `ledger`.
///
/// Order: start the run, crawl every site, load a fresh inventory snapshot,
/// match, record new products, record offers, complete the run. A failed
/// write for a single discovery or offer is logged and skipped.
///
/// # Errors
///
/// - [`DiscoveryError::StartRun`] if the run cannot be created (including
///   another run already active for one of the sites). Nothing else happens.
/// - [`DiscoveryError::Snapshot`] if the inventory cannot be loaded; the run
///   is marked failed before anything is matched.
/// - [`DiscoveryError::CompleteRun`] if the completion write fails.
/// - [`DiscoveryError::Panicked`] if the run body panicked.
pub async fn run_discovery<F, I, L>(
    crawler: &Crawler<'_, F>,
    sites: &[SiteConfig],
    inventory: &I,
    ledger: &L,
    policy: MatchPolicy,
) -> Result<RunReport, DiscoveryError>
where
    F: PageFetcher,
    I: InventorySource,
    L: LedgerSink,
{
    let slugs: Vec<String> = sites.iter().map(SiteConfig::slug).collect();
    let run_id = ledger
        .start_run(&slugs)
        .await
        .map_err(DiscoveryError::StartRun)?;
    tracing::info!(run_id, sites = ?slugs, "discovery run started");

    let body = AssertUnwindSafe(run_body(run_id, crawler, sites, inventory, ledger, policy))
        .catch_unwind()
        .await;

    match body {
        Ok(Ok(report)) => {
            if let Err(source) = ledger.complete_run(run_id, report.counts).await {
                fail_run_best_effort(
                    ledger,
                    run_id,
                    &format!("failed to record run completion: {source}"),
                )
                .await;
                return Err(DiscoveryError::CompleteRun { run_id, source });
            }
            tracing::info!(
                run_id,
                urls_discovered = report.counts.urls_discovered,
                new_products_found = report.counts.new_products_found,
                new_offers_found = report.counts.new_offers_found,
                existing_products = report.existing_products,
                record_failures = report.record_failures,
                "discovery run completed"
            );
            Ok(report)
        }
        Ok(Err(e)) => {
            fail_run_best_effort(ledger, run_id, &e.to_string()).await;
            Err(e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(run_id, panic = %message, "discovery run panicked");
            fail_run_best_effort(ledger, run_id, &format!("run panicked: {message}")).await;
            Err(DiscoveryError::Panicked { run_id, message })
        }
    }
}

async fn run_body<F, I, L>(
    run_id: i64,
    crawler: &Crawler<'_, F>,
    sites: &[SiteConfig],
    inventory: &I,
    ledger: &L,
    policy: MatchPolicy,
) -> Result<RunReport, DiscoveryError>
where
    F: PageFetcher,
    I: InventorySource,
    L: LedgerSink,
{
    let outcome = crawler.crawl(sites).await;

    let snapshot = InventorySnapshot::load(inventory)
        .await
        .map_err(DiscoveryError::Snapshot)?;
    let matches = classify_discoveries(outcome.discoveries(), &snapshot, policy);

    let mut record_failures = 0usize;
    let mut new_products = 0usize;
    let mut seen = HashSet::new();
    for discovery in &matches.new {
        if !seen.insert(discovery.canonical_url.as_str()) {
            continue;
        }
        match ledger
            .record_discovery(run_id, &NewDiscovery::from(*discovery))
            .await
        {
            Ok(_) => new_products += 1,
            Err(e) => {
                record_failures += 1;
                tracing::warn!(run_id, url = %discovery.canonical_url, error = %e, "failed to record discovery");
            }
        }
    }

    let mut new_offers = 0usize;
    for offer in &matches.offers {
        match ledger
            .record_offer(run_id, &OfferObservation::from(*offer))
            .await
        {
            Ok(true) => new_offers += 1,
            Ok(false) => {}
            Err(e) => {
                record_failures += 1;
                tracing::warn!(run_id, url = %offer.canonical_url, error = %e, "failed to record offer");
            }
        }
    }

    let counts = RunCounts {
        urls_discovered: saturating_i32(outcome.discovery_count()),
        new_products_found: saturating_i32(new_products),
        new_offers_found: saturating_i32(new_offers),
    };

    Ok(RunReport {
        run_id,
        counts,
        existing_products: matches.existing.len(),
        record_failures,
        sites: outcome.sites.clone(),
    })
}

/// Attempts to mark the run failed. A failure here is logged and swallowed:
/// the caller is already returning the original error.
async fn fail_run_best_effort<L: LedgerSink>(ledger: &L, run_id: i64, message: &str) {
    tracing::warn!(run_id, error = message, "marking discovery run failed");
    if let Err(e) = ledger.fail_run(run_id, message).await {
        tracing::error!(run_id, error = %e, "failed to mark discovery run as failed");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
