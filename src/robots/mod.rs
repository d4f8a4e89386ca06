//! Robots.txt handling module
//!
//! Robots rules are fetched at most once per host per run. The cache hands
//! every caller for the same host the same lazily-initialized cell, so
//! concurrent workers wait on a single robots.txt request.

mod parser;

pub use parser::ParsedRobots;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Per-run robots.txt cache keyed by host (with port)
#[derive(Debug, Default)]
pub struct RobotsCache {
    hosts: Mutex<HashMap<String, Arc<OnceCell<ParsedRobots>>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rules for `host_key`, running `fetch` only on first use
    pub async fn get_or_fetch<F, Fut>(&self, host_key: &str, fetch: F) -> ParsedRobots
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ParsedRobots>,
    {
        let cell = {
            let mut hosts = match self.hosts.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            hosts.entry(host_key.to_string()).or_default().clone()
        };

        cell.get_or_init(fetch).await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fetches_once_per_host() {
        let cache = RobotsCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let robots = cache
                .get_or_fetch("example.com", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    ParsedRobots::from_content("User-agent: *\nDisallow: /private")
                })
                .await;
            assert!(!robots.is_allowed("https://example.com/private", "TestBot"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hosts_are_independent() {
        let cache = RobotsCache::new();
        let a = cache
            .get_or_fetch("a.example.com", || async { ParsedRobots::allow_all() })
            .await;
        let b = cache
            .get_or_fetch("b.example.com", || async {
                ParsedRobots::from_content("User-agent: *\nDisallow: /")
            })
            .await;

        assert!(a.is_allowed("https://a.example.com/x", "TestBot"));
        assert!(!b.is_allowed("https://b.example.com/x", "TestBot"));
    }
}
