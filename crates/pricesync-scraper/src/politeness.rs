//! Politeness pacing: the only points where a crawl yields.

use std::time::Duration;

use pricesync_core::AppConfig;
use rand::Rng;

/// Delay bounds for one crawl. A randomized pause in `[min_delay, max_delay]`
/// precedes every fetch; `site_cooldown` separates consecutive sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Politeness {
    min_delay: Duration,
    max_delay: Duration,
    site_cooldown: Duration,
}

impl Politeness {
    /// Bounds given out of order are swapped.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, site_cooldown: Duration) -> Self {
        Self {
            min_delay: min_delay.min(max_delay),
            max_delay: min_delay.max(max_delay),
            site_cooldown,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_secs(config.crawl_min_delay_secs),
            Duration::from_secs(config.crawl_max_delay_secs),
            Duration::from_secs(config.crawl_site_cooldown_secs),
        )
    }

    /// No pauses at all. Used by tests that only care about traversal.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    #[must_use]
    pub fn site_cooldown(&self) -> Duration {
        self.site_cooldown
    }

    /// Draws the next inter-request delay uniformly at millisecond
    /// resolution.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.min_delay == self.max_delay {
            return self.min_delay;
        }
        let min_ms = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }

    /// Sleeps for one randomized inter-request delay.
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis(), "politeness delay");
            tokio::time::sleep(delay).await;
        }
    }

    /// Sleeps for the fixed inter-site cooldown.
    pub async fn cooldown(&self) {
        if !self.site_cooldown.is_zero() {
            tracing::info!(
                cooldown_secs = self.site_cooldown.as_secs(),
                "cooling down before next site"
            );
            tokio::time::sleep(self.site_cooldown).await;
        }
    }
}
