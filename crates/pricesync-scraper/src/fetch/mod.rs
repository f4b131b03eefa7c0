//! The page-fetch capability consumed by the crawler.
//!
//! The crawler only needs `Result<html, ScraperError>` per URL. How a page
//! is fetched (remote stealth browser, plain HTTP) and how often it is
//! retried is decided here, never in the crawl loop.

mod direct;
mod service;

use std::future::Future;

use pricesync_core::{AppConfig, FetchBackend};

use crate::error::ScraperError;

pub use direct::HttpFetcher;
pub use service::{ScrapeServiceFetcher, ScrapeServiceOptions};

/// Fetches one page and returns its full HTML document.
///
/// Implementations report every failure as an `Err`; they must not panic on
/// network or status errors.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>> + Send;
}

/// The fetcher selected by `PRICESYNC_FETCH_BACKEND`.
#[derive(Debug)]
pub enum ConfiguredFetcher {
    Service(ScrapeServiceFetcher),
    Direct(HttpFetcher),
}

impl ConfiguredFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ScraperError> {
        match config.fetch_backend {
            FetchBackend::Service => Ok(Self::Service(ScrapeServiceFetcher::from_app_config(
                config,
            )?)),
            FetchBackend::Direct => Ok(Self::Direct(HttpFetcher::from_app_config(config)?)),
        }
    }
}

impl PageFetcher for ConfiguredFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        match self {
            Self::Service(fetcher) => fetcher.fetch(url).await,
            Self::Direct(fetcher) => fetcher.fetch(url).await,
        }
    }
}

/// Reads `Retry-After` as whole seconds, defaulting to 60.
fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(60)
}
