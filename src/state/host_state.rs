use crate::config::CrawlerConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Tracks politeness state for one host during crawling
///
/// Holds the per-host concurrency semaphore, the time of the last request
/// and any robots.txt `Crawl-delay` that overrides the configured spacing.
#[derive(Debug, Clone)]
pub struct HostState {
    /// Number of requests made to this host in the current run
    pub request_count: u32,

    /// When the last request to this host was released
    pub last_request_time: Option<Instant>,

    /// Crawl delay announced by robots.txt, if any
    pub crawl_delay: Option<Duration>,

    /// Bounds concurrent fetches against this host
    pub permits: Arc<Semaphore>,
}

impl HostState {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            request_count: 0,
            last_request_time: None,
            crawl_delay: None,
            permits: Arc::new(Semaphore::new(config.per_host_concurrency as usize)),
        }
    }

    /// Effective spacing between requests: the larger of config and robots.txt
    pub fn effective_delay(&self, config: &CrawlerConfig) -> Duration {
        let configured = Duration::from_millis(config.minimum_delay_ms);
        match self.crawl_delay {
            Some(robots) => configured.max(robots),
            None => configured,
        }
    }

    /// Returns None if a request can be made now, or the duration to wait otherwise
    pub fn time_until_next_request(
        &self,
        config: &CrawlerConfig,
        now: Instant,
    ) -> Option<Duration> {
        let last = self.last_request_time?;
        let min_delay = self.effective_delay(config);
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was made to this host
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }
}
