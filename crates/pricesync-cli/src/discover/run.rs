use pricesync_core::AppConfig;
use pricesync_db::PgStore;
use pricesync_scraper::{
    run_discovery, ClassifierRules, ConfiguredFetcher, Crawler, MatchPolicy, MemoryInventory,
    MemoryLedger, Politeness, RunReport,
};

use super::{select_sites, truncate};

/// Crawl the configured supplier sites, match against the tracked catalog,
/// and record new products and offers in the database.
///
/// # Errors
///
/// Returns an error if the sites cannot be loaded, the fetcher cannot be
/// built, another run already covers one of the sites, the catalog cannot be
/// loaded, or the run cannot be closed. Individual page failures are logged
/// and reflected in the per-site summary.
pub(crate) async fn run_discover(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    site_filter: Option<&str>,
) -> anyhow::Result<()> {
    let sites = select_sites(config, site_filter)?;
    if sites.is_empty() {
        println!("no sites configured in {}", config.sites_path.display());
        return Ok(());
    }

    let fetcher = ConfiguredFetcher::from_app_config(config)?;
    let crawler = Crawler::new(
        &fetcher,
        ClassifierRules::default(),
        Politeness::from_app_config(config),
        config.crawl_page_budget,
    );
    let store = PgStore::new(pool.clone());

    let report = run_discovery(
        &crawler,
        &sites,
        &store,
        &store,
        MatchPolicy::from_app_config(config),
    )
    .await?;

    print_report(&report);
    Ok(())
}

/// Same crawl as [`run_discover`], recorded in memory against an empty
/// catalog so every product candidate is reported as new.
///
/// # Errors
///
/// Returns an error if the sites cannot be loaded or the fetcher cannot be
/// built.
pub(crate) async fn run_discover_dry(
    config: &AppConfig,
    site_filter: Option<&str>,
) -> anyhow::Result<()> {
    let sites = select_sites(config, site_filter)?;
    let slugs: Vec<String> = sites.iter().map(pricesync_core::SiteConfig::slug).collect();
    println!(
        "dry-run: crawling {} site(s): [{}]",
        sites.len(),
        slugs.join(", ")
    );

    let fetcher = ConfiguredFetcher::from_app_config(config)?;
    let crawler = Crawler::new(
        &fetcher,
        ClassifierRules::default(),
        Politeness::from_app_config(config),
        config.crawl_page_budget,
    );
    let ledger = MemoryLedger::new();

    let report = run_discovery(
        &crawler,
        &sites,
        &MemoryInventory::empty(),
        &ledger,
        MatchPolicy::from_app_config(config),
    )
    .await?;

    print_report(&report);

    let products = ledger.products();
    if !products.is_empty() {
        println!();
        println!("{:<12}{:<50}TITLE", "PRICE", "URL");
        for p in &products {
            println!(
                "{:<12}{:<50}{}",
                p.detected_price.as_deref().unwrap_or("\u{2014}"),
                truncate(&p.url_canonical, 47),
                p.page_title.as_deref().map_or(String::new(), |t| truncate(t, 40)),
            );
        }
    }

    let offers = ledger.offers();
    if !offers.is_empty() {
        println!();
        println!("{:<50}TITLE", "OFFER");
        for offer in &offers {
            println!(
                "{:<50}{}",
                truncate(&offer.observation.offer_url, 47),
                offer
                    .observation
                    .title
                    .as_deref()
                    .map_or(String::new(), |t| truncate(t, 40))
            );
        }
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!("run {}", report.run_id);
    println!(
        "{:<28}{:<11}{:>8}{:>10}{:>10}{:>13}",
        "SITE", "STATE", "FETCHED", "FAILURES", "SKIPPED", "DISCOVERIES"
    );
    for site in &report.sites {
        println!(
            "{:<28}{:<11}{:>8}{:>10}{:>10}{:>13}",
            truncate(&site.site, 25),
            site.state.as_str(),
            site.pages_fetched,
            site.fetch_failures,
            site.skipped_excluded,
            site.discoveries.len()
        );
    }
    println!();
    println!(
        "urls discovered: {}, new products: {}, new offers: {}, already tracked: {}",
        report.counts.urls_discovered,
        report.counts.new_products_found,
        report.counts.new_offers_found,
        report.existing_products
    );
    if report.record_failures > 0 {
        println!(
            "warning: {} ledger write(s) failed; see logs",
            report.record_failures
        );
    }
}
