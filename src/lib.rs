//! Docs-Mirror: a deterministic documentation mirror
//!
//! This crate crawls a documentation site by following same-site links,
//! normalizes every page's content region into a canonical block structure,
//! and writes each page as a Markdown file at a path derived only from its URL.
//! Re-running the crawl over unchanged content leaves the output tree untouched.

pub mod config;
pub mod crawler;
pub mod normalize;
pub mod output;
pub mod robots;
pub mod site;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Docs-Mirror operations
///
/// Only the variants raised by [`crawler::Coordinator::run`] end a run; every
/// per-page problem is recorded in the run manifest instead.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frontier error: {0}")]
    Frontier(#[from] FrontierError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output root {path} is no longer available")]
    OutputRootLost { path: String },

    #[error("Run manifest lock poisoned")]
    ManifestPoisoned,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Failure of a single fetch attempt
///
/// The variant decides whether the Frontier retries the URL, see
/// [`FetchError::is_transient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("connection failed: {0}")]
    ConnectionReset(String),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("redirect loop")]
    RedirectLoop,

    #[error("redirected off-site to {0}")]
    OffSiteRedirect(String),

    #[error("disallowed by robots.txt")]
    Disallowed,

    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Returns true if a later attempt at the same URL may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionReset(_) | Self::Network(_) => true,
            Self::HttpStatus(code) => *code == 408 || *code == 429 || *code >= 500,
            Self::TooManyRedirects
            | Self::RedirectLoop
            | Self::OffSiteRedirect(_)
            | Self::Disallowed
            | Self::UnsupportedContent(_) => false,
        }
    }
}

/// Frontier bookkeeping errors
///
/// Any of these means the crawl state can no longer be trusted.
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Frontier lock poisoned")]
    Poisoned,

    #[error("Unknown URL: {0}")]
    UnknownUrl(String),

    #[error("Invalid state transition for {url}: {from} -> {to}")]
    InvalidTransition {
        url: String,
        from: state::CrawlState,
        to: state::CrawlState,
    },
}

/// Errors raised while persisting a page or the manifest
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Output root {0} is missing or not a directory")]
    OutputRoot(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for Docs-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use output::RunManifest;
pub use state::CrawlState;
pub use url::{normalize_url, CanonicalUrl};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::ConnectionReset("reset".to_string()).is_transient());
        assert!(FetchError::HttpStatus(503).is_transient());
        assert!(FetchError::HttpStatus(429).is_transient());
        assert!(FetchError::HttpStatus(408).is_transient());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!FetchError::HttpStatus(404).is_transient());
        assert!(!FetchError::HttpStatus(403).is_transient());
        assert!(!FetchError::RedirectLoop.is_transient());
        assert!(!FetchError::TooManyRedirects.is_transient());
        assert!(!FetchError::Disallowed.is_transient());
    }
}
