//! Domain types shared by the crawler, the matcher, and the run ledger.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Lifecycle of a crawl run. Runs are created `running` and written exactly
/// once more with a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlRunStatus {
    Running,
    Completed,
    Failed,
}

impl CrawlRunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CrawlRunStatus::Running => "running",
            CrawlRunStatus::Completed => "completed",
            CrawlRunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CrawlRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrawlRunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(CrawlRunStatus::Running),
            "completed" => Ok(CrawlRunStatus::Completed),
            "failed" => Ok(CrawlRunStatus::Failed),
            other => Err(CoreError::UnknownRunStatus(other.to_string())),
        }
    }
}

/// Review state of a discovered product.
///
/// Any transition between these states is permitted; the only validation is
/// that the status string is one of the four known values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStatus {
    Pending,
    Reviewed,
    Ignored,
    Added,
}

impl DiscoveryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryStatus::Pending => "pending",
            DiscoveryStatus::Reviewed => "reviewed",
            DiscoveryStatus::Ignored => "ignored",
            DiscoveryStatus::Added => "added",
        }
    }
}

impl std::fmt::Display for DiscoveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DiscoveryStatus::Pending),
            "reviewed" => Ok(DiscoveryStatus::Reviewed),
            "ignored" => Ok(DiscoveryStatus::Ignored),
            "added" => Ok(DiscoveryStatus::Added),
            _ => Err(CoreError::UnknownDiscoveryStatus(s.to_string())),
        }
    }
}

/// Whether a crawled page is a product candidate or a promotional offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryKind {
    Product,
    Offer,
}

/// One classified URL produced during a crawl. Transient: only the product
/// candidates that survive matching are persisted, as [`NewDiscovery`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    /// URL exactly as it was fetched.
    pub url: String,
    /// Comparison key produced by the canonicalizer.
    pub canonical_url: String,
    /// Lower-cased host without `www.`.
    pub domain: String,
    pub kind: DiscoveryKind,
    pub page_title: Option<String>,
    /// Price as a plain decimal string, e.g. `"12999.00"`.
    pub detected_price: Option<String>,
    /// Meta description; only populated for offers.
    pub summary: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_through: Option<NaiveDate>,
}

impl DiscoveredUrl {
    #[must_use]
    pub fn is_offer(&self) -> bool {
        self.kind == DiscoveryKind::Offer
    }
}

/// A product candidate classified as new, ready to be written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDiscovery {
    pub url: String,
    pub url_canonical: String,
    pub domain: String,
    pub page_title: Option<String>,
    pub detected_price: Option<String>,
}

impl From<&DiscoveredUrl> for NewDiscovery {
    fn from(d: &DiscoveredUrl) -> Self {
        Self {
            url: d.url.clone(),
            url_canonical: d.canonical_url.clone(),
            domain: d.domain.clone(),
            page_title: d.page_title.clone(),
            detected_price: d.detected_price.clone(),
        }
    }
}

/// One sighting of a promotional page, upserted by `offer_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferObservation {
    pub domain: String,
    /// `None` when the page had no title. A stored title is never replaced
    /// by a missing one; a first sighting without one is titled by its URL.
    pub title: Option<String>,
    pub summary: Option<String>,
    pub offer_url: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

impl From<&DiscoveredUrl> for OfferObservation {
    fn from(d: &DiscoveredUrl) -> Self {
        Self {
            domain: d.domain.clone(),
            title: d.page_title.clone(),
            summary: d.summary.clone(),
            offer_url: d.canonical_url.clone(),
            starts_on: d.valid_from,
            ends_on: d.valid_through,
        }
    }
}

/// Final counts written when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub urls_discovered: i32,
    pub new_products_found: i32,
    pub new_offers_found: i32,
}

/// One execution of the crawler. Append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRun {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: CrawlRunStatus,
    pub sites_crawled: Vec<String>,
    pub counts: RunCounts,
    pub error_message: Option<String>,
}

/// A persisted new-product discovery awaiting (or past) review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredProduct {
    pub id: i64,
    pub crawl_run_id: Option<i64>,
    pub url: String,
    pub url_canonical: String,
    pub domain: String,
    pub page_title: Option<String>,
    pub detected_price: Option<String>,
    pub status: DiscoveryStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
