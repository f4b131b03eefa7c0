use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

/// A supplier website crawled for new products and offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    /// Starting points for the breadth-first crawl. All seeds of one site
    /// must share a host.
    pub seed_urls: Vec<String>,
    /// Per-site override of the global page budget.
    #[serde(default)]
    pub page_budget: Option<usize>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SiteConfig {
    /// Generate a URL-safe slug from the site name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' || c == '.' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Lower-cased host of the first seed URL, with any leading `www.`
    /// removed. `None` when the seed is not an absolute http(s) URL.
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        self.seed_urls.first().and_then(|seed| seed_host(seed))
    }
}

#[derive(Debug, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<SiteConfig>,
}

/// Load and validate the supplier site list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sites_file: SitesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::SitesFileParse)?;

    validate_sites(&sites_file)?;

    Ok(sites_file)
}

fn validate_sites(sites_file: &SitesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for site in &sites_file.sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site name must be non-empty".to_string(),
            ));
        }

        if site.seed_urls.is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has no seed_urls",
                site.name
            )));
        }

        let mut hosts = HashSet::new();
        for seed in &site.seed_urls {
            let Some(host) = seed_host(seed) else {
                return Err(ConfigError::Validation(format!(
                    "site '{}' has an invalid seed URL '{seed}'; expected an absolute http(s) URL",
                    site.name
                )));
            };
            hosts.insert(host);
        }
        if hosts.len() > 1 {
            return Err(ConfigError::Validation(format!(
                "site '{}' mixes seed hosts; every seed must be on the same domain",
                site.name
            )));
        }

        if site.page_budget == Some(0) {
            return Err(ConfigError::Validation(format!(
                "site '{}' has page_budget 0; must be at least 1",
                site.name
            )));
        }

        if !seen_names.insert(site.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site name: '{}'",
                site.name
            )));
        }

        let slug = site.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site slug: '{}' (from site '{}')",
                slug, site.name
            )));
        }
    }

    Ok(())
}

/// Host of an absolute http(s) seed URL, lower-cased and without leading
/// `www.` labels. `None` when the seed does not parse, uses another scheme,
/// or has no host.
fn seed_host(seed: &str) -> Option<String> {
    let url = Url::parse(seed.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let mut host = url.host_str()?.to_ascii_lowercase();
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest.to_string();
    }
    (!host.is_empty()).then_some(host)
}

#[cfg(test)]
#[path = "sites_test.rs"]
mod tests;
