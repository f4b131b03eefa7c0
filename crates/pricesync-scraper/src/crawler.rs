use pricesync_core::{DiscoveredUrl, SiteConfig};

use crate::classify::ClassifierRules;
use crate::fetch::PageFetcher;
use crate::frontier::{Frontier, SiteSummary};
use crate::politeness::Politeness;

/// Everything one crawl produced, site by site in crawl order.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub sites: Vec<SiteSummary>,
}

impl CrawlOutcome {
    /// Product candidates and offers from every site, flattened.
    pub fn discoveries(&self) -> impl Iterator<Item = &DiscoveredUrl> {
        self.sites.iter().flat_map(|s| s.discoveries.iter())
    }

    #[must_use]
    pub fn discovery_count(&self) -> usize {
        self.sites.iter().map(|s| s.discoveries.len()).sum()
    }
}

/// Crawls supplier sites one at a time, in the given order, with a fixed
/// cooldown between consecutive sites.
#[derive(Debug)]
pub struct Crawler<'a, F> {
    fetcher: &'a F,
    rules: ClassifierRules,
    politeness: Politeness,
    default_page_budget: usize,
}

impl<'a, F: PageFetcher> Crawler<'a, F> {
    #[must_use]
    pub fn new(
        fetcher: &'a F,
        rules: ClassifierRules,
        politeness: Politeness,
        default_page_budget: usize,
    ) -> Self {
        Self {
            fetcher,
            rules,
            politeness,
            default_page_budget,
        }
    }

    /// Each site gets its own [`Frontier`]; no crawl state is shared across
    /// sites. A failed site is reported in its summary and never stops the
    /// sites after it.
    pub async fn crawl(&self, sites: &[SiteConfig]) -> CrawlOutcome {
        let mut outcome = CrawlOutcome::default();

        for (index, site) in sites.iter().enumerate() {
            if index > 0 {
                self.politeness.cooldown().await;
            }
            let mut frontier = Frontier::new(
                site,
                self.default_page_budget,
                self.rules.clone(),
                self.politeness,
            );
            outcome.sites.push(frontier.crawl(self.fetcher).await);
        }

        outcome
    }
}
