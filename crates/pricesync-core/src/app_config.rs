use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How supplier pages are fetched during a discovery crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBackend {
    /// Through the remote headless-browser scrape service (`POST /scrape`).
    Service,
    /// Plain HTTP `GET` from this process.
    Direct,
}

impl std::fmt::Display for FetchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchBackend::Service => write!(f, "service"),
            FetchBackend::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sites_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_backend: FetchBackend,
    pub scrape_service_url: String,
    pub scrape_render_js: Option<bool>,
    pub scrape_proxy_url: Option<String>,
    pub scrape_stealth: bool,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
    pub crawl_min_delay_secs: u64,
    pub crawl_max_delay_secs: u64,
    pub crawl_site_cooldown_secs: u64,
    pub crawl_page_budget: usize,
    pub match_min_identifier_len: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sites_path", &self.sites_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_backend", &self.fetch_backend)
            .field("scrape_service_url", &self.scrape_service_url)
            .field("scrape_render_js", &self.scrape_render_js)
            .field(
                "scrape_proxy_url",
                &self.scrape_proxy_url.as_ref().map(|_| "[redacted]"),
            )
            .field("scrape_stealth", &self.scrape_stealth)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .field("crawl_min_delay_secs", &self.crawl_min_delay_secs)
            .field("crawl_max_delay_secs", &self.crawl_max_delay_secs)
            .field("crawl_site_cooldown_secs", &self.crawl_site_cooldown_secs)
            .field("crawl_page_budget", &self.crawl_page_budget)
            .field("match_min_identifier_len", &self.match_min_identifier_len)
            .finish()
    }
}
