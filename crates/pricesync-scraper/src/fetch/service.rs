use std::time::Duration;

use pricesync_core::AppConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{retry_after_secs, PageFetcher};
use crate::canonical::domain_of;
use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

/// Flags forwarded verbatim to the scrape service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeServiceOptions {
    pub render_js: Option<bool>,
    pub proxy_url: Option<String>,
    pub stealth: bool,
}

impl Default for ScrapeServiceOptions {
    fn default() -> Self {
        Self {
            render_js: None,
            proxy_url: None,
            stealth: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    render_js: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy_url: Option<&'a str>,
    stealth: bool,
}

#[derive(Debug, Deserialize)]
struct ScrapeEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    detail: Option<ScrapeFailure>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    html: String,
    status: u16,
}

#[derive(Debug, Deserialize)]
struct ScrapeFailure {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_type: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Client for the stealth-browser scrape service (`POST /scrape`).
///
/// The service answers 200 with `{"success": true, "data": {...}}` when the
/// browser loaded the page, whatever status the page itself returned, and
/// 500 with `{"success": false, "detail": {...}}` when the browser failed.
#[derive(Debug)]
pub struct ScrapeServiceFetcher {
    client: Client,
    base_url: String,
    options: ScrapeServiceOptions,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl ScrapeServiceFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        options: ScrapeServiceOptions,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
            max_retries,
            backoff_base_secs,
        })
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            &config.scrape_service_url,
            ScrapeServiceOptions {
                render_js: config.scrape_render_js,
                proxy_url: config.scrape_proxy_url.clone(),
                stealth: config.scrape_stealth,
            },
            config.scraper_request_timeout_secs,
            config.scraper_max_retries,
            config.scraper_retry_backoff_base_secs,
        )
    }

    /// Checks `GET /health` answers `{"status": "ok"}`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UnexpectedStatus`] for a non-2xx answer,
    /// [`ScraperError::Deserialize`] for an unexpected body, and
    /// [`ScraperError::ScrapeService`] when the service reports another status.
    pub async fn health(&self) -> Result<(), ScraperError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let parsed: HealthResponse =
            serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
                context: format!("health response from {url}"),
                source: e,
            })?;
        if parsed.status == "ok" {
            Ok(())
        } else {
            Err(ScraperError::ScrapeService {
                url,
                error_type: "HealthCheck".to_string(),
                message: format!("service reported status '{}'", parsed.status),
            })
        }
    }

    async fn scrape_once(&self, url: &str) -> Result<String, ScraperError> {
        let endpoint = format!("{}/scrape", self.base_url);
        let request = ScrapeRequest {
            url,
            render_js: self.options.render_js,
            proxy_url: self.options.proxy_url.as_deref(),
            stealth: self.options.stealth,
        };

        let response = self.client.post(&endpoint).json(&request).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScraperError::RateLimited {
                domain: domain_of(url).unwrap_or_default(),
                retry_after_secs: retry_after_secs(response.headers()),
            });
        }

        let body = response.text().await?;

        if !status.is_success() {
            // The service reports browser failures as a 500 with a detail body.
            return Err(match serde_json::from_str::<ScrapeEnvelope>(&body) {
                Ok(ScrapeEnvelope {
                    detail: Some(detail),
                    ..
                }) => service_failure(url, detail),
                _ => ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: endpoint,
                },
            });
        }

        let envelope: ScrapeEnvelope =
            serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
                context: format!("scrape service response for {url}"),
                source: e,
            })?;

        match envelope {
            ScrapeEnvelope {
                success: true,
                data: Some(data),
                ..
            } => {
                if (200..300).contains(&data.status) {
                    Ok(data.html)
                } else {
                    Err(ScraperError::UpstreamStatus {
                        status: data.status,
                        url: url.to_string(),
                    })
                }
            }
            ScrapeEnvelope {
                detail: Some(detail),
                ..
            } => Err(service_failure(url, detail)),
            _ => Err(ScraperError::ScrapeService {
                url: url.to_string(),
                error_type: "MalformedResponse".to_string(),
                message: "response carried neither data nor detail".to_string(),
            }),
        }
    }
}

fn service_failure(url: &str, detail: ScrapeFailure) -> ScraperError {
    ScraperError::ScrapeService {
        url: url.to_string(),
        error_type: detail.error_type,
        message: detail.message,
    }
}

impl PageFetcher for ScrapeServiceFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.scrape_once(url)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_flags() {
        let request = ScrapeRequest {
            url: "https://site.nz/x",
            render_js: None,
            proxy_url: None,
            stealth: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "https://site.nz/x", "stealth": true})
        );
    }

    #[test]
    fn request_includes_set_flags() {
        let request = ScrapeRequest {
            url: "https://site.nz/x",
            render_js: Some(false),
            proxy_url: Some("http://proxy:3128"),
            stealth: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["render_js"], serde_json::json!(false));
        assert_eq!(json["proxy_url"], serde_json::json!("http://proxy:3128"));
        assert_eq!(json["stealth"], serde_json::json!(false));
    }

    #[test]
    fn envelope_ignores_headers_and_extra_fields() {
        let body = r#"{"success":true,"data":{"html":"<p>x</p>","status":200,"headers":{"server":"nginx"}}}"#;
        let envelope: ScrapeEnvelope = serde_json::from_str(body).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap().html, "<p>x</p>");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let fetcher = ScrapeServiceFetcher::new(
            "http://127.0.0.1:8002/",
            ScrapeServiceOptions::default(),
            5,
            0,
            0,
        )
        .unwrap();
        assert_eq!(fetcher.base_url, "http://127.0.0.1:8002");
    }
}
