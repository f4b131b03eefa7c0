//! Multi-tier product matching against a point-in-time inventory snapshot.
//!
//! Tier 1 is an exact canonical URL lookup. Tier 2 compares the last path
//! segment of the discovery against catalog SKUs and against the last path
//! segments of catalog URLs, which recovers products a supplier moved under
//! a new category prefix without changing the product identifier.
//!
//! Classification is pure: the snapshot is built before matching starts and
//! is read-only afterwards.

use std::collections::HashSet;

use pricesync_core::{AppConfig, DiscoveredUrl, InventorySource, StoreError};

use crate::canonical::{canonicalize, last_path_segment};

/// Policy knobs for Tier 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Identifiers shorter than this never match via Tier 2.
    pub min_identifier_len: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            min_identifier_len: 3,
        }
    }
}

impl MatchPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            min_identifier_len: config.match_min_identifier_len,
        }
    }
}

/// The three indices every matching decision consults.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    canonical_urls: HashSet<String>,
    skus: HashSet<String>,
    identifiers: HashSet<String>,
}

impl InventorySnapshot {
    /// Builds all three indices at once. Catalog URLs are canonicalized here;
    /// malformed ones are skipped with a warning rather than indexed under a
    /// placeholder key. SKUs are trimmed and lower-cased.
    pub fn build<U, S>(urls: U, skus: S) -> Self
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let mut canonical_urls = HashSet::new();
        let mut identifiers = HashSet::new();
        for raw in urls {
            let raw = raw.as_ref();
            match canonicalize(raw) {
                Ok(canonical) => {
                    if let Some(segment) = last_path_segment(&canonical) {
                        identifiers.insert(segment);
                    }
                    canonical_urls.insert(canonical);
                }
                Err(e) => {
                    tracing::warn!(url = raw, error = %e, "skipping malformed catalog URL");
                }
            }
        }

        let skus = skus
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            canonical_urls,
            skus,
            identifiers,
        }
    }

    /// Loads the catalog from `source` and builds the snapshot.
    ///
    /// # Errors
    ///
    /// Propagates any [`StoreError`] from the source. A failed load must end
    /// the matching pass: matching against a partial snapshot would report
    /// every known product as new.
    pub async fn load<I: InventorySource>(source: &I) -> Result<Self, StoreError> {
        let urls = source.load_canonical_urls().await?;
        let skus = source.load_skus().await?;
        let snapshot = Self::build(&urls, &skus);
        tracing::info!(
            canonical_urls = snapshot.canonical_urls.len(),
            skus = snapshot.skus.len(),
            identifiers = snapshot.identifiers.len(),
            "inventory snapshot loaded"
        );
        Ok(snapshot)
    }

    #[must_use]
    pub fn contains_url(&self, canonical_url: &str) -> bool {
        self.canonical_urls.contains(canonical_url)
    }

    /// `identifier` must already be lower-cased.
    #[must_use]
    pub fn contains_identifier(&self, identifier: &str) -> bool {
        self.skus.contains(identifier) || self.identifiers.contains(identifier)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical_urls.is_empty() && self.skus.is_empty()
    }
}

/// Which tier recognised a discovery as an existing product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    CanonicalUrl,
    Identifier,
}

/// Discoveries split by matching outcome. Offers bypass matching entirely.
#[derive(Debug, Default)]
pub struct Matches<'a> {
    pub existing: Vec<(&'a DiscoveredUrl, MatchTier)>,
    pub new: Vec<&'a DiscoveredUrl>,
    pub offers: Vec<&'a DiscoveredUrl>,
}

/// Returns the tier that matched `discovery`, or `None` for a new product.
#[must_use]
pub fn match_discovery(
    discovery: &DiscoveredUrl,
    snapshot: &InventorySnapshot,
    policy: MatchPolicy,
) -> Option<MatchTier> {
    if snapshot.contains_url(&discovery.canonical_url) {
        return Some(MatchTier::CanonicalUrl);
    }

    let identifier = last_path_segment(&discovery.canonical_url)?;
    if identifier.chars().count() < policy.min_identifier_len {
        return None;
    }
    snapshot
        .contains_identifier(&identifier)
        .then_some(MatchTier::Identifier)
}

/// Splits discoveries into existing products, new products, and offers.
pub fn classify_discoveries<'a, I>(
    discoveries: I,
    snapshot: &InventorySnapshot,
    policy: MatchPolicy,
) -> Matches<'a>
where
    I: IntoIterator<Item = &'a DiscoveredUrl>,
{
    let mut matches = Matches::default();
    for discovery in discoveries {
        if discovery.is_offer() {
            matches.offers.push(discovery);
            continue;
        }
        match match_discovery(discovery, snapshot, policy) {
            Some(tier) => {
                tracing::debug!(url = %discovery.canonical_url, ?tier, "matched existing product");
                matches.existing.push((discovery, tier));
            }
            None => matches.new.push(discovery),
        }
    }
    matches
}
