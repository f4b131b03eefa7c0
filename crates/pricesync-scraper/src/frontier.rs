//! Breadth-first crawl of one supplier site.
//!
//! A [`Frontier`] owns the visited set and the pending queue for a single
//! site. Both are reset at the start of every [`Frontier::crawl`] call and
//! never shared with another site. Fetches are strictly sequential: at most
//! one request is in flight, and a politeness delay precedes each one.

use std::collections::{HashSet, VecDeque};

use pricesync_core::{DiscoveredUrl, DiscoveryKind, SiteConfig};
use serde::Serialize;

use crate::canonical::{canonicalize, domain_of};
use crate::classify::{ClassifierRules, PageClass};
use crate::fetch::PageFetcher;
use crate::links::extract_links;
use crate::page::PageMetadata;
use crate::politeness::Politeness;

/// Lifecycle of one site crawl: `Idle → Running → {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteState {
    Idle,
    Running,
    Completed,
    /// Every fetch attempt for the site failed.
    Failed,
}

impl SiteState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SiteState::Idle => "idle",
            SiteState::Running => "running",
            SiteState::Completed => "completed",
            SiteState::Failed => "failed",
        }
    }
}

/// What one site crawl produced.
#[derive(Debug, Clone, Serialize)]
pub struct SiteSummary {
    /// Site slug.
    pub site: String,
    pub state: SiteState,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    /// Extracted links skipped by the path-only exclusion check.
    pub skipped_excluded: usize,
    pub discoveries: Vec<DiscoveredUrl>,
}

impl SiteSummary {
    #[must_use]
    pub fn fetch_attempts(&self) -> usize {
        self.pages_fetched + self.fetch_failures
    }
}

#[derive(Debug)]
struct Pending {
    url: String,
    is_seed: bool,
}

#[derive(Debug)]
pub struct Frontier {
    site: String,
    // Seed host; links are kept same-host, so every discovery shares it.
    domain: Option<String>,
    seeds: Vec<String>,
    page_budget: usize,
    rules: ClassifierRules,
    politeness: Politeness,
    state: SiteState,
    visited: HashSet<String>,
    queued: HashSet<String>,
    queue: VecDeque<Pending>,
}

impl Frontier {
    /// `default_page_budget` applies unless the site sets its own.
    #[must_use]
    pub fn new(
        site: &SiteConfig,
        default_page_budget: usize,
        rules: ClassifierRules,
        politeness: Politeness,
    ) -> Self {
        Self {
            site: site.slug(),
            domain: site.domain(),
            seeds: site.seed_urls.clone(),
            page_budget: site.page_budget.unwrap_or(default_page_budget),
            rules,
            politeness,
            state: SiteState::Idle,
            visited: HashSet::new(),
            queued: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SiteState {
        self.state
    }

    #[must_use]
    pub fn page_budget(&self) -> usize {
        self.page_budget
    }

    /// Walks the site breadth-first from its seeds until the queue empties
    /// or the page budget (fetch attempts, failures included) is spent.
    ///
    /// Seeds are always fetched. Extracted links whose path is excluded are
    /// skipped without a fetch. A failed fetch is logged and the URL stays
    /// visited, so it is not retried within this crawl.
    pub async fn crawl<F: PageFetcher>(&mut self, fetcher: &F) -> SiteSummary {
        self.visited.clear();
        self.queued.clear();
        self.queue.clear();
        self.state = SiteState::Running;

        let mut summary = SiteSummary {
            site: self.site.clone(),
            state: SiteState::Running,
            pages_fetched: 0,
            fetch_failures: 0,
            skipped_excluded: 0,
            discoveries: Vec::new(),
        };

        let seeds = self.seeds.clone();
        for seed in &seeds {
            self.enqueue(seed, true);
        }

        tracing::info!(
            site = %self.site,
            domain = self.domain.as_deref().unwrap_or("-"),
            seeds = seeds.len(),
            page_budget = self.page_budget,
            "site crawl started"
        );

        while let Some(next) = self.queue.pop_front() {
            if summary.fetch_attempts() >= self.page_budget {
                tracing::info!(
                    site = %self.site,
                    page_budget = self.page_budget,
                    remaining = self.queue.len() + 1,
                    "page budget reached"
                );
                break;
            }

            let Ok(canonical) = canonicalize(&next.url) else {
                tracing::warn!(site = %self.site, url = %next.url, "skipping malformed URL");
                continue;
            };
            if !self.visited.insert(canonical.clone()) {
                continue;
            }
            if !next.is_seed && self.rules.is_excluded_path(&next.url) {
                tracing::debug!(site = %self.site, url = %next.url, "skipping excluded URL");
                summary.skipped_excluded += 1;
                continue;
            }

            self.politeness.pause().await;
            let html = match fetcher.fetch(&next.url).await {
                Ok(html) => {
                    summary.pages_fetched += 1;
                    html
                }
                Err(e) => {
                    summary.fetch_failures += 1;
                    tracing::warn!(site = %self.site, url = %next.url, error = %e, "fetch failed, skipping URL");
                    continue;
                }
            };

            if let Some(discovery) = self.discover(&next.url, canonical, &html) {
                tracing::debug!(
                    site = %self.site,
                    url = %discovery.url,
                    kind = ?discovery.kind,
                    "page discovered"
                );
                summary.discoveries.push(discovery);
            }

            for link in extract_links(&html, &next.url) {
                self.enqueue(&link, false);
            }
        }

        self.state = if summary.fetch_attempts() > 0 && summary.pages_fetched == 0 {
            SiteState::Failed
        } else {
            SiteState::Completed
        };
        summary.state = self.state;

        tracing::info!(
            site = %self.site,
            state = ?summary.state,
            pages_fetched = summary.pages_fetched,
            fetch_failures = summary.fetch_failures,
            skipped_excluded = summary.skipped_excluded,
            discoveries = summary.discoveries.len(),
            "site crawl finished"
        );

        summary
    }

    fn enqueue(&mut self, url: &str, is_seed: bool) {
        let Ok(canonical) = canonicalize(url) else {
            tracing::debug!(site = %self.site, url, "dropping unparseable link");
            return;
        };
        if self.visited.contains(&canonical) || !self.queued.insert(canonical) {
            return;
        }
        self.queue.push_back(Pending {
            url: url.to_string(),
            is_seed,
        });
    }

    fn discover(&self, url: &str, canonical_url: String, html: &str) -> Option<DiscoveredUrl> {
        let kind = match self.rules.classify(url, html)? {
            PageClass::Excluded => return None,
            PageClass::Offer => DiscoveryKind::Offer,
            PageClass::ProductCandidate => DiscoveryKind::Product,
        };
        let meta = PageMetadata::extract(html);
        let is_offer = kind == DiscoveryKind::Offer;
        Some(DiscoveredUrl {
            url: url.to_string(),
            domain: self
                .domain
                .clone()
                .or_else(|| domain_of(&canonical_url))
                .unwrap_or_default(),
            canonical_url,
            kind,
            page_title: meta.title,
            detected_price: meta.price,
            summary: meta.summary.filter(|_| is_offer),
            valid_from: meta.valid_from.filter(|_| is_offer),
            valid_through: meta.valid_through.filter(|_| is_offer),
        })
    }
}

#[cfg(test)]
#[path = "frontier_test.rs"]
mod tests;
