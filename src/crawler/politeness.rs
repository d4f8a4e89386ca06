//! Per-host politeness: concurrency caps and request spacing

use crate::config::CrawlerConfig;
use crate::state::HostState;
use crate::FetchError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Tracks every host touched during a run
///
/// A fetch against a host first takes one of the host's permits, then waits
/// until the host's request spacing has elapsed. The permit is held until the
/// response body is read.
#[derive(Debug)]
pub struct Politeness {
    hosts: Mutex<HashMap<String, HostState>>,
    config: CrawlerConfig,
}

impl Politeness {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            hosts: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn permits(&self, host: &str) -> Result<Arc<Semaphore>, FetchError> {
        let mut hosts = self
            .hosts
            .lock()
            .map_err(|_| FetchError::Network("host table lock poisoned".to_string()))?;
        Ok(hosts
            .entry(host.to_string())
            .or_insert_with(|| HostState::new(&self.config))
            .permits
            .clone())
    }

    /// Waits for a slot on `host` and reserves the next request time
    pub async fn acquire(&self, host: &str) -> Result<OwnedSemaphorePermit, FetchError> {
        let permit = self
            .permits(host)?
            .acquire_owned()
            .await
            .map_err(|_| FetchError::Network("host semaphore closed".to_string()))?;

        loop {
            let wait = {
                let mut hosts = self
                    .hosts
                    .lock()
                    .map_err(|_| FetchError::Network("host table lock poisoned".to_string()))?;
                let state = hosts
                    .entry(host.to_string())
                    .or_insert_with(|| HostState::new(&self.config));
                let now = Instant::now();
                match state.time_until_next_request(&self.config, now) {
                    Some(wait) => wait,
                    None => {
                        state.record_request(now);
                        return Ok(permit);
                    }
                }
            };
            tracing::trace!("Waiting {:?} before next request to {}", wait, host);
            tokio::time::sleep(wait).await;
        }
    }

    /// Applies a robots.txt `Crawl-delay` to a host
    pub fn set_crawl_delay(&self, host: &str, delay: Duration) {
        if let Ok(mut hosts) = self.hosts.lock() {
            hosts
                .entry(host.to_string())
                .or_insert_with(|| HostState::new(&self.config))
                .crawl_delay = Some(delay);
        }
    }
}
