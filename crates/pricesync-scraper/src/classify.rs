//! URL classification: excluded boilerplate, offer page, or product candidate.
//!
//! Exclusion and offer checks look only at path segments, so they can run
//! before a page is fetched. The product-candidate check needs the body.
//! Matching is per segment and case-insensitive; a substring match over the
//! whole URL would flag slugs like `/bf225-presale-pack` as offers.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static OFFER_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:offers?|promotions?|specials?|deals?|sale)$").expect("valid regex")
});
static PRICE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class\s*=\s*["'][^"']*price[^"']*["']|itemprop\s*=\s*["']price["']"#)
        .expect("valid regex")
});
static ADD_TO_CART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)add[\s_-]*to[\s_-]*(?:cart|basket|bag)").expect("valid regex")
});
static PRODUCT_SCHEMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)"@type"\s*:\s*\[?\s*"Product"|itemtype\s*=\s*["']https?://schema\.org/Product["']"#)
        .expect("valid regex")
});

/// Non-product keywords. A path segment that equals or starts with one of
/// these marks the whole URL as excluded.
pub const DEFAULT_EXCLUDE_KEYWORDS: [&str; 18] = [
    "about",
    "contact",
    "finance",
    "dealers",
    "privacy",
    "terms",
    "careers",
    "news",
    "faq",
    "category",
    "categories",
    "collection",
    "cart",
    "checkout",
    "account",
    "sitemap",
    "login",
    "404",
];

/// Result of classifying one fetched URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageClass {
    /// Boilerplate or landing page; never a discovery.
    Excluded,
    /// Promotional page, tracked separately from products.
    Offer,
    /// Page carrying at least one product marker.
    ProductCandidate,
}

/// Configurable block-list for the path-only exclusion check.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    exclude_keywords: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDE_KEYWORDS.iter().copied())
    }
}

impl ClassifierRules {
    /// Builds rules from a keyword list. Keywords are lower-cased; blank
    /// entries are ignored.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exclude_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { exclude_keywords }
    }

    /// Path-only exclusion. Site roots and URLs that cannot be parsed are
    /// excluded as well.
    #[must_use]
    pub fn is_excluded_path(&self, url: &str) -> bool {
        let Some(segments) = path_segments(url) else {
            return true;
        };
        if segments.is_empty() {
            return true;
        }
        segments.iter().any(|segment| {
            self.exclude_keywords
                .iter()
                .any(|keyword| segment.starts_with(keyword.as_str()))
        })
    }

    /// `true` when any path segment is an offer keyword such as `offers`,
    /// `promotion`, `specials`, `deal` or `sale`.
    #[must_use]
    pub fn is_offer_path(url: &str) -> bool {
        path_segments(url).is_some_and(|segments| {
            segments
                .iter()
                .any(|segment| OFFER_SEGMENT_RE.is_match(segment))
        })
    }

    /// Classifies a fetched page. Exclusion wins over offer, and offer wins
    /// over product candidate.
    ///
    /// Returns `None` for a page that is neither excluded nor an offer and
    /// carries no product marker; such pages are skipped without error.
    #[must_use]
    pub fn classify(&self, url: &str, html: &str) -> Option<PageClass> {
        if self.is_excluded_path(url) {
            return Some(PageClass::Excluded);
        }
        if Self::is_offer_path(url) {
            return Some(PageClass::Offer);
        }
        has_product_marker(html).then_some(PageClass::ProductCandidate)
    }
}

/// Price-styled element, add-to-cart control, or `Product` structured data.
#[must_use]
pub fn has_product_marker(html: &str) -> bool {
    PRICE_MARKER_RE.is_match(html)
        || ADD_TO_CART_RE.is_match(html)
        || PRODUCT_SCHEMA_RE.is_match(html)
}

fn path_segments(url: &str) -> Option<Vec<String>> {
    let parsed = Url::parse(url).ok()?;
    let segments = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .collect();
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_HTML: &str =
        r#"<html><body><h1>BF225</h1><span class="product-price">$38,999.00</span></body></html>"#;
    const PLAIN_HTML: &str = "<html><body><p>Nothing to see here.</p></body></html>";

    #[test]
    fn excludes_keyword_segments_and_prefixes() {
        let rules = ClassifierRules::default();
        assert!(rules.is_excluded_path("https://site.nz/about"));
        assert!(rules.is_excluded_path("https://site.nz/about-us"));
        assert!(rules.is_excluded_path("https://site.nz/support/Contact"));
        assert!(rules.is_excluded_path("https://site.nz/collections/outboards"));
        assert!(rules.is_excluded_path("https://site.nz/categories/portable"));
        assert!(rules.is_excluded_path("https://site.nz/404"));
    }

    #[test]
    fn keyword_inside_a_segment_is_not_excluded() {
        let rules = ClassifierRules::default();
        assert!(!rules.is_excluded_path("https://site.nz/outboards/bf225-about-town"));
        assert!(!rules.is_excluded_path("https://site.nz/outboards/bf225"));
    }

    #[test]
    fn root_and_malformed_urls_are_excluded() {
        let rules = ClassifierRules::default();
        assert!(rules.is_excluded_path("https://site.nz/"));
        assert!(rules.is_excluded_path("https://site.nz"));
        assert!(rules.is_excluded_path("::not a url::"));
    }

    #[test]
    fn custom_keywords_replace_defaults() {
        let rules = ClassifierRules::new(["Warranty", "  "]);
        assert!(rules.is_excluded_path("https://site.nz/warranty-claims"));
        assert!(!rules.is_excluded_path("https://site.nz/about"));
    }

    #[test]
    fn offer_paths_match_whole_segments_only() {
        assert!(ClassifierRules::is_offer_path("https://site.nz/offers/winter"));
        assert!(ClassifierRules::is_offer_path("https://site.nz/Promotion"));
        assert!(ClassifierRules::is_offer_path("https://site.nz/marine/specials/bf60"));
        assert!(ClassifierRules::is_offer_path("https://site.nz/deal/x"));
        assert!(ClassifierRules::is_offer_path("https://site.nz/sale"));
        assert!(!ClassifierRules::is_offer_path("https://site.nz/outboards/bf225-presale"));
        assert!(!ClassifierRules::is_offer_path("https://site.nz/wholesale"));
    }

    #[test]
    fn exclusion_beats_offer() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.classify("https://site.nz/news/offers", PRODUCT_HTML),
            Some(PageClass::Excluded)
        );
        assert_eq!(
            rules.classify("https://site.nz/offers/about-this-deal", PRODUCT_HTML),
            Some(PageClass::Excluded)
        );
    }

    #[test]
    fn offer_beats_product_candidate() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.classify("https://site.nz/offers/winter", PRODUCT_HTML),
            Some(PageClass::Offer)
        );
    }

    #[test]
    fn product_candidate_needs_a_marker() {
        let rules = ClassifierRules::default();
        assert_eq!(
            rules.classify("https://site.nz/outboards/bf225", PRODUCT_HTML),
            Some(PageClass::ProductCandidate)
        );
        assert_eq!(
            rules.classify("https://site.nz/outboards/bf225", PLAIN_HTML),
            None
        );
    }

    #[test]
    fn recognises_each_marker_kind() {
        assert!(has_product_marker(r#"<div itemprop="price" content="1.00"></div>"#));
        assert!(has_product_marker(r#"<button>Add to Cart</button>"#));
        assert!(has_product_marker(r#"<form action="/add_to_basket"></form>"#));
        assert!(has_product_marker(
            r#"<script type="application/ld+json">{"@type": "Product", "name": "BF225"}</script>"#
        ));
        assert!(has_product_marker(
            r#"<div itemscope itemtype="https://schema.org/Product"></div>"#
        ));
        assert!(!has_product_marker(PLAIN_HTML));
    }
}
