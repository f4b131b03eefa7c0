pub mod canonical;
pub mod classify;
pub mod crawler;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod links;
pub mod matcher;
pub mod memory;
pub mod page;
pub mod pipeline;
pub mod politeness;
mod rate_limit;

pub use canonical::canonicalize;
pub use classify::{ClassifierRules, PageClass};
pub use crawler::{CrawlOutcome, Crawler};
pub use error::{DiscoveryError, ScraperError};
pub use fetch::{
    ConfiguredFetcher, HttpFetcher, PageFetcher, ScrapeServiceFetcher, ScrapeServiceOptions,
};
pub use frontier::{Frontier, SiteState, SiteSummary};
pub use links::extract_links;
pub use matcher::{
    classify_discoveries, match_discovery, InventorySnapshot, MatchPolicy, MatchTier, Matches,
};
pub use memory::{MemoryInventory, MemoryLedger, RecordedOffer};
pub use page::PageMetadata;
pub use pipeline::{run_discovery, RunReport};
pub use politeness::Politeness;
