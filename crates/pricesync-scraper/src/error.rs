use pricesync_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("upstream page {url} answered HTTP {status}")]
    UpstreamStatus { status: u16, url: String },

    #[error("scrape service failed for {url}: {error_type}: {message}")]
    ScrapeService {
        url: String,
        error_type: String,
        message: String,
    },
}

/// Errors that end a discovery run. Everything recoverable (a failed fetch,
/// a malformed link, one failed ledger write) is logged and skipped instead.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to start crawl run: {0}")]
    StartRun(#[source] StoreError),

    #[error("failed to load inventory snapshot: {0}")]
    Snapshot(#[source] StoreError),

    #[error("failed to complete crawl run {run_id}: {source}")]
    CompleteRun {
        run_id: i64,
        #[source]
        source: StoreError,
    },

    #[error("crawl run {run_id} panicked: {message}")]
    Panicked { run_id: i64, message: String },
}
