pub mod app_config;
pub mod config;
pub mod discovery;
pub mod sites;
pub mod store;

pub use app_config::{AppConfig, Environment, FetchBackend};
pub use config::{load_app_config, load_app_config_from_env};
pub use discovery::{
    CrawlRun, CrawlRunStatus, DiscoveredProduct, DiscoveredUrl, DiscoveryKind, DiscoveryStatus,
    NewDiscovery, OfferObservation, RunCounts,
};
pub use sites::{load_sites, SiteConfig, SitesFile};
pub use store::{InventorySource, LedgerSink, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sites file {path}: {source}")]
    SitesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sites file: {0}")]
    SitesFileParse(#[from] serde_yaml::Error),

    #[error("sites validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown discovery status: {0}")]
    UnknownDiscoveryStatus(String),

    #[error("unknown crawl run status: {0}")]
    UnknownRunStatus(String),
}
