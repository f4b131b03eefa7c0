//! Discovery command handlers for the CLI.
//!
//! `run` crawls the configured supplier sites and records new products and
//! offers; the remaining subcommands read or update the run ledger and the
//! review queue.

mod query;
mod run;

use chrono::{DateTime, Utc};
use clap::Subcommand;

pub(crate) use query::{
    run_discover_pending, run_discover_reconcile, run_discover_review, run_discover_runs,
};
pub(crate) use run::{run_discover, run_discover_dry};

/// Sub-commands available under `discover`.
#[derive(Debug, Subcommand)]
pub enum DiscoverCommands {
    /// Crawl supplier sites and record new products and offers
    Run {
        /// Restrict the crawl to one site (by slug)
        #[arg(long)]
        site: Option<String>,
        /// Crawl and match against an empty catalog without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Show recent crawl runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Show discovered products awaiting review
    Pending {
        /// Maximum number of products to show
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Set the review status of a discovered product
    Review {
        /// Discovered product id
        id: i64,
        /// New status: pending, reviewed, ignored, or added
        status: String,
        /// Who made the decision
        #[arg(long)]
        reviewer: Option<String>,
    },
    /// Mark runs stuck in `running` as failed
    Reconcile {
        /// Runs started longer ago than this are considered abandoned
        #[arg(long, default_value = "360")]
        older_than_mins: u32,
    },
}

/// Routes a `discover` subcommand to its handler.
///
/// # Errors
///
/// Propagates the handler's error.
pub(crate) async fn dispatch(
    pool: &sqlx::PgPool,
    config: &pricesync_core::AppConfig,
    command: DiscoverCommands,
) -> anyhow::Result<()> {
    match command {
        DiscoverCommands::Run { site, dry_run } => {
            if dry_run {
                run_discover_dry(config, site.as_deref()).await
            } else {
                run_discover(pool, config, site.as_deref()).await
            }
        }
        DiscoverCommands::Runs { limit } => run_discover_runs(pool, i64::from(limit)).await,
        DiscoverCommands::Pending { limit } => run_discover_pending(pool, i64::from(limit)).await,
        DiscoverCommands::Review {
            id,
            status,
            reviewer,
        } => run_discover_review(pool, id, &status, reviewer.as_deref()).await,
        DiscoverCommands::Reconcile { older_than_mins } => {
            run_discover_reconcile(pool, older_than_mins).await
        }
    }
}

/// Loads the site list and applies the optional `--site` filter.
///
/// # Errors
///
/// Returns an error if the sites file cannot be loaded or no site has the
/// requested slug.
pub(crate) fn select_sites(
    config: &pricesync_core::AppConfig,
    site_filter: Option<&str>,
) -> anyhow::Result<Vec<pricesync_core::SiteConfig>> {
    let sites = pricesync_core::load_sites(&config.sites_path)?.sites;
    match site_filter {
        None => Ok(sites),
        Some(slug) => {
            let selected: Vec<_> = sites.into_iter().filter(|s| s.slug() == slug).collect();
            if selected.is_empty() {
                anyhow::bail!(
                    "site '{slug}' not found in {}",
                    config.sites_path.display()
                );
            }
            Ok(selected)
        }
    }
}

/// Format an optional timestamp for display; `None` renders as a dash.
fn fmt_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "\u{2014}".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Shortens `s` to `max` characters with a trailing `...`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_values() {
        assert_eq!(truncate("BF225", 10), "BF225");
        assert_eq!(truncate("Honda BF225 outboard", 5), "Honda...");
    }

    #[test]
    fn fmt_time_uses_dash_for_missing() {
        assert_eq!(fmt_time(None), "\u{2014}");
    }
}
