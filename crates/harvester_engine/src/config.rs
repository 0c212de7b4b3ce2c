use std::time::Duration;

use harvester_core::{DEFAULT_BASE_DELAY, DEFAULT_FAILURE_THRESHOLD, DEFAULT_JITTER_RATIO};
use serde::{Deserialize, Serialize};

/// Tunables for the acquisition strategies and the batch orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Consecutive page failures that trip the circuit breaker.
    pub breaker_threshold: u32,
    /// Centre of the jittered wait between requests.
    pub base_delay_ms: u64,
    pub jitter_ratio: f64,
    /// How often the exhaustion watcher polls during top-level acquisition.
    pub exhaustion_poll_ms: u64,
    pub page_size: u32,
    /// Attempts at a single reply page before the root is given up. Values
    /// below `breaker_threshold` are raised to it, see [`Self::page_attempts`].
    pub max_page_retries: u32,
    /// Nested tasks allowed in flight at once; `None` starts every root together.
    pub max_concurrent_roots: Option<usize>,
    pub top_level_timeout_ms: Option<u64>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            breaker_threshold: DEFAULT_FAILURE_THRESHOLD,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            jitter_ratio: DEFAULT_JITTER_RATIO,
            exhaustion_poll_ms: 300,
            page_size: 20,
            max_page_retries: DEFAULT_FAILURE_THRESHOLD,
            max_concurrent_roots: None,
            top_level_timeout_ms: None,
        }
    }
}

impl CrawlSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn exhaustion_poll_interval(&self) -> Duration {
        Duration::from_millis(self.exhaustion_poll_ms.max(1))
    }

    pub fn top_level_timeout(&self) -> Option<Duration> {
        self.top_level_timeout_ms.map(Duration::from_millis)
    }

    /// Attempts allowed at one reply page. Never fewer than the breaker
    /// threshold, so a root failing alone trips the breaker before it is
    /// given up.
    pub fn page_attempts(&self) -> u32 {
        self.max_page_retries.max(self.breaker_threshold).max(1)
    }

    /// Fan-out width for `selected` roots; always at least one.
    pub fn concurrency_for(&self, selected: usize) -> usize {
        let width = match self.max_concurrent_roots {
            Some(limit) => limit.min(selected),
            None => selected,
        };
        width.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: CrawlSettings = serde_json::from_str(r#"{"page_size": 50}"#).unwrap();
        assert_eq!(parsed.page_size, 50);
        assert_eq!(parsed.breaker_threshold, 5);
        assert_eq!(parsed.base_delay(), Duration::from_millis(1000));
        assert_eq!(parsed.max_concurrent_roots, None);
        assert_eq!(parsed.max_page_retries, 5);
    }

    #[test]
    fn page_attempts_never_undercut_the_breaker() {
        let mut settings = CrawlSettings::default();
        assert_eq!(settings.page_attempts(), 5);
        settings.max_page_retries = 2;
        assert_eq!(settings.page_attempts(), 5);
        settings.max_page_retries = 8;
        assert_eq!(settings.page_attempts(), 8);
        settings.breaker_threshold = 0;
        settings.max_page_retries = 0;
        assert_eq!(settings.page_attempts(), 1);
    }

    #[test]
    fn concurrency_is_bounded_and_non_zero() {
        let mut settings = CrawlSettings::default();
        assert_eq!(settings.concurrency_for(7), 7);
        assert_eq!(settings.concurrency_for(0), 1);
        settings.max_concurrent_roots = Some(3);
        assert_eq!(settings.concurrency_for(7), 3);
        assert_eq!(settings.concurrency_for(2), 2);
        settings.max_concurrent_roots = Some(0);
        assert_eq!(settings.concurrency_for(7), 1);
    }
}
