use crate::app_config::{AppConfig, Environment, FetchBackend};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so the
/// tests can drive them with a plain `HashMap`.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_flag = |var: &str| -> Result<Option<bool>, ConfigError> {
        match lookup(var) {
            Ok(raw) => parse_bool(&raw)
                .map(Some)
                .ok_or_else(|| invalid(var, format!("expected a boolean, got '{raw}'"))),
            Err(_) => Ok(None),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("PRICESYNC_ENV", "development"))?;
    let log_level = or_default("PRICESYNC_LOG_LEVEL", "info");
    let sites_path = PathBuf::from(or_default("PRICESYNC_SITES_PATH", "./config/sites.yaml"));

    let db_max_connections = parse_u32("PRICESYNC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICESYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICESYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_backend = parse_fetch_backend(&or_default("PRICESYNC_FETCH_BACKEND", "service"))?;
    let scrape_service_url = or_default("PRICESYNC_SCRAPE_SERVICE_URL", "http://127.0.0.1:8002");
    let scrape_render_js = parse_flag("PRICESYNC_SCRAPE_RENDER_JS")?;
    let scrape_proxy_url = lookup("PRICESYNC_SCRAPE_PROXY_URL")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let scrape_stealth = parse_flag("PRICESYNC_SCRAPE_STEALTH")?.unwrap_or(true);

    let scraper_request_timeout_secs =
        parse_u64("PRICESYNC_SCRAPER_REQUEST_TIMEOUT_SECS", "120")?;
    let scraper_user_agent = or_default(
        "PRICESYNC_SCRAPER_USER_AGENT",
        "pricesync/0.1 (supplier-discovery)",
    );
    let scraper_max_retries = parse_u32("PRICESYNC_SCRAPER_MAX_RETRIES", "2")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("PRICESYNC_SCRAPER_RETRY_BACKOFF_BASE_SECS", "5")?;

    let crawl_min_delay_secs = parse_u64("PRICESYNC_CRAWL_MIN_DELAY_SECS", "30")?;
    let crawl_max_delay_secs = parse_u64("PRICESYNC_CRAWL_MAX_DELAY_SECS", "60")?;
    if crawl_min_delay_secs > crawl_max_delay_secs {
        return Err(invalid(
            "PRICESYNC_CRAWL_MIN_DELAY_SECS",
            format!(
                "minimum delay {crawl_min_delay_secs}s exceeds maximum delay {crawl_max_delay_secs}s"
            ),
        ));
    }
    let crawl_site_cooldown_secs = parse_u64("PRICESYNC_CRAWL_SITE_COOLDOWN_SECS", "120")?;
    let crawl_page_budget = parse_usize("PRICESYNC_CRAWL_PAGE_BUDGET", "200")?;
    if crawl_page_budget == 0 {
        return Err(invalid(
            "PRICESYNC_CRAWL_PAGE_BUDGET",
            "page budget must be at least 1".to_string(),
        ));
    }
    let match_min_identifier_len = parse_usize("PRICESYNC_MATCH_MIN_IDENTIFIER_LEN", "3")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sites_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_backend,
        scrape_service_url,
        scrape_render_js,
        scrape_proxy_url,
        scrape_stealth,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        crawl_min_delay_secs,
        crawl_max_delay_secs,
        crawl_site_cooldown_secs,
        crawl_page_budget,
        match_min_identifier_len,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized environment values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        _ => Err(ConfigError::InvalidEnvVar {
            var: "PRICESYNC_ENV".to_string(),
            reason: format!(
                "unrecognized environment '{s}'; expected development, test, or production"
            ),
        }),
    }
}

fn parse_fetch_backend(s: &str) -> Result<FetchBackend, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "service" => Ok(FetchBackend::Service),
        "direct" => Ok(FetchBackend::Direct),
        _ => Err(ConfigError::InvalidEnvVar {
            var: "PRICESYNC_FETCH_BACKEND".to_string(),
            reason: format!("unrecognized fetch backend '{s}'; expected service or direct"),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
