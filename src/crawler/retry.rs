//! Retry backoff policy

use crate::config::CrawlerConfig;
use crate::url::CanonicalUrl;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Exponential backoff with deterministic jitter
///
/// The delay before retry `n` (1-based) is `base * 2^(n-1)` capped at `max`,
/// then scaled into `[d/2, d]` by a fraction derived from a SHA-256 of the URL
/// and attempt number. Two runs over the same failures wait the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.retry_base_delay_ms),
            max: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    /// Backoff before the given retry of a URL
    pub fn delay_for(&self, attempt: u32, url: &CanonicalUrl) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let ceiling = self.base.saturating_mul(1u32 << exponent).min(self.max);

        let digest = Sha256::digest(format!("{}#{}", url, attempt).as_bytes());
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        let fraction = u64::from_be_bytes(seed) as f64 / u64::MAX as f64;

        let half = ceiling / 2;
        half + (ceiling - half).mul_f64(fraction)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
