//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent
//! - robots.txt checks, fetched once per host
//! - Global and per-host concurrency limits
//! - Redirect limits and loop detection
//! - Error classification into [`FetchError`]

use crate::config::Config;
use crate::crawler::politeness::Politeness;
use crate::robots::{ParsedRobots, RobotsCache};
use crate::url::{canonicalize, CanonicalUrl};
use crate::FetchError;
use chrono::{DateTime, Utc};
use reqwest::{redirect::Policy, Client, Response};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: CanonicalUrl,
    /// URL the response came from after redirects
    pub final_url: CanonicalUrl,
    /// The final URL exactly as served, the base for relative links
    pub response_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    /// True when the response came from a different URL than requested
    pub fn was_redirected(&self) -> bool {
        self.url != self.final_url
    }
}

/// Why the redirect policy stopped following a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RedirectFailure {
    #[error("redirect limit exceeded")]
    TooMany,
    #[error("redirect loop")]
    Loop,
}

/// Follows up to `limit` redirects, stopping early on a loop
pub fn redirect_policy(limit: u32) -> Policy {
    let limit = limit as usize;
    Policy::custom(move |attempt| {
        if attempt.previous().len() > limit {
            attempt.error(RedirectFailure::TooMany)
        } else if attempt.previous().iter().any(|seen| seen == attempt.url()) {
            attempt.error(RedirectFailure::Loop)
        } else {
            attempt.follow()
        }
    })
}

/// Builds an HTTP client with proper configuration
///
/// The user agent has the form `Name/Version (+ContactURL; ContactEmail)`.
///
/// # Arguments
///
/// * `config` - Configuration supplying the user agent and request limits
///
/// # Returns
///
/// A reqwest client with the redirect policy installed
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(redirect_policy(config.crawler.redirect_limit))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Classifies a transport error
pub fn map_reqwest_error(err: &reqwest::Error) -> FetchError {
    if err.is_redirect() {
        let mut source = err.source();
        while let Some(inner) = source {
            if let Some(failure) = inner.downcast_ref::<RedirectFailure>() {
                return match failure {
                    RedirectFailure::TooMany => FetchError::TooManyRedirects,
                    RedirectFailure::Loop => FetchError::RedirectLoop,
                };
            }
            source = inner.source();
        }
        return FetchError::TooManyRedirects;
    }

    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::ConnectionReset(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

/// True for `text/html` and `application/xhtml+xml`, ignoring parameters
fn is_html(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "text/html" || media_type == "application/xhtml+xml"
}

/// Fetches pages while honoring robots.txt and concurrency limits
pub struct Fetcher {
    client: Client,
    global: Arc<Semaphore>,
    politeness: Arc<Politeness>,
    robots: RobotsCache,
    respect_robots: bool,
    robots_agent: String,
}

impl Fetcher {
    /// Creates a fetcher with its own client, permits and robots cache
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration for concurrency limits, politeness and robots
    ///
    /// # Returns
    ///
    /// The fetcher, or the error from building the HTTP client
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            global: Arc::new(Semaphore::new(config.crawler.fetch_concurrency().max(1) as usize)),
            politeness: Arc::new(Politeness::new(config.crawler.clone())),
            robots: RobotsCache::new(),
            respect_robots: config.crawler.respect_robots,
            robots_agent: config.user_agent.crawler_name.clone(),
        })
    }

    /// Fetches one page
    ///
    /// # Request Flow
    ///
    /// 1. Check robots.txt for the URL's host (fetched on first use)
    /// 2. Take a global fetch permit, then a permit for the host
    /// 3. Send the GET request, following redirects under the configured limit
    /// 4. Reject non-2xx statuses and non-HTML content types
    /// 5. Read the body while still holding both permits
    ///
    /// # Arguments
    ///
    /// * `url` - Canonical URL to request
    ///
    /// # Returns
    ///
    /// The fetched page, or a classified `FetchError` whose `is_transient`
    /// decides whether the frontier retries it
    pub async fn fetch(&self, url: &CanonicalUrl) -> Result<FetchedPage, FetchError> {
        if self.respect_robots {
            let robots = self.robots_for(url).await;
            if !robots.is_allowed(url.as_str(), &self.robots_agent) {
                tracing::debug!("Disallowed by robots.txt: {}", url);
                return Err(FetchError::Disallowed);
            }
        }

        let _global = self
            .global
            .acquire()
            .await
            .map_err(|_| FetchError::Network("fetch semaphore closed".to_string()))?;
        let _host = self.politeness.acquire(&url.host_key()).await?;

        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let response_url = response.url().clone();
        let final_url = canonicalize(response_url.clone())
            .map_err(|_| FetchError::OffSiteRedirect(response_url.to_string()))?;

        let content_type = content_type(&response);
        if let Some(ct) = &content_type {
            if !is_html(ct) {
                return Err(FetchError::UnsupportedContent(ct.clone()));
            }
        }

        let body = response.text().await.map_err(|e| map_reqwest_error(&e))?;

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            response_url,
            status: status.as_u16(),
            content_type,
            body,
            fetched_at: Utc::now(),
        })
    }

    /// Rules for the URL's host, fetching robots.txt on first use
    async fn robots_for(&self, url: &CanonicalUrl) -> ParsedRobots {
        let host = url.host_key();
        let robots_url = format!("{}://{}/robots.txt", url.as_url().scheme(), host);
        self.robots
            .get_or_fetch(&host, || self.fetch_robots(robots_url, host.clone()))
            .await
    }

    async fn fetch_robots(&self, robots_url: String, host: String) -> ParsedRobots {
        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("No robots.txt for {}: {}", host, e);
                return ParsedRobots::allow_all();
            }
        };

        if !response.status().is_success() {
            tracing::debug!("robots.txt for {} returned {}", host, response.status());
            return ParsedRobots::allow_all();
        }

        let robots = match response.text().await {
            Ok(text) => ParsedRobots::from_content(&text),
            Err(_) => ParsedRobots::allow_all(),
        };

        if let Some(delay) = robots.crawl_delay(&self.robots_agent) {
            tracing::info!("robots.txt for {} sets a crawl delay of {:?}", host, delay);
            self.politeness.set_crawl_delay(&host, delay);
        }
        robots
    }
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
