use serde::Deserialize;

/// Main configuration structure for Docs-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of worker tasks drawing from the frontier
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Maximum number of fetches in flight across all hosts (defaults to `workers`)
    #[serde(rename = "max-concurrent-fetches", default)]
    pub max_concurrent_fetches: Option<u32>,

    /// Maximum number of fetches in flight against a single host
    #[serde(rename = "per-host-concurrency", default = "default_per_host")]
    pub per_host_concurrency: u32,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "minimum-delay-ms", default = "default_min_delay")]
    pub minimum_delay_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay (milliseconds); doubles on every retry
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base")]
    pub retry_base_delay_ms: u64,

    /// Upper bound on a single backoff delay (milliseconds)
    #[serde(rename = "retry-max-delay-ms", default = "default_retry_max")]
    pub retry_max_delay_ms: u64,

    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(rename = "redirect-limit", default = "default_redirect_limit")]
    pub redirect_limit: u32,

    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Stop claiming new pages after this many
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<usize>,

    /// Stop the run after this many seconds
    #[serde(rename = "max-duration-secs", default)]
    pub max_duration_secs: Option<u64>,

    /// How long in-flight pages may finish after a stop signal
    #[serde(rename = "shutdown-grace-secs", default = "default_grace")]
    pub shutdown_grace_secs: u64,
}

impl CrawlerConfig {
    /// Effective global fetch bound
    pub fn fetch_concurrency(&self) -> u32 {
        self.max_concurrent_fetches.unwrap_or(self.workers)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_concurrent_fetches: None,
            per_host_concurrency: default_per_host(),
            minimum_delay_ms: default_min_delay(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base(),
            retry_max_delay_ms: default_retry_max(),
            request_timeout_secs: default_timeout(),
            redirect_limit: default_redirect_limit(),
            respect_robots: true,
            max_pages: None,
            max_duration_secs: None,
            shutdown_grace_secs: default_grace(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives the Markdown tree
    pub root: String,

    /// Where the run manifest is written (defaults to `<root>/crawl-manifest.json`)
    #[serde(rename = "manifest-path", default)]
    pub manifest_path: Option<String>,

    /// Append an "On this page" anchor list when section headings exist
    #[serde(rename = "on-this-page", default)]
    pub on_this_page: bool,
}

impl OutputConfig {
    pub fn manifest_path(&self) -> String {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| format!("{}/crawl-manifest.json", self.root.trim_end_matches('/')))
    }
}

/// The site being mirrored
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Human-readable site name, used in every page title line
    pub name: String,

    /// URLs the crawl starts from
    pub seeds: Vec<String>,

    /// Host patterns considered same-site (e.g., "docs.example.com" or "*.example.com").
    /// Defaults to the hosts of the seed URLs.
    #[serde(rename = "allowed-hosts", default)]
    pub allowed_hosts: Vec<String>,

    /// Only paths starting with one of these prefixes are crawled
    #[serde(rename = "include-prefixes", default)]
    pub include_prefixes: Vec<String>,

    /// Paths starting with one of these prefixes are never crawled
    #[serde(rename = "exclude-prefixes", default)]
    pub exclude_prefixes: Vec<String>,

    /// Selectors tried in order to locate the content region
    #[serde(rename = "content-selectors", default)]
    pub content_selectors: Vec<String>,

    /// Extra selectors for navigation chrome to strip
    #[serde(rename = "chrome-selectors", default)]
    pub chrome_selectors: Vec<String>,

    /// Element role overrides for the normalizer
    #[serde(default)]
    pub roles: Vec<RoleEntry>,
}

/// A selector forced to a specific normalizer role
#[derive(Debug, Clone, Deserialize)]
pub struct RoleEntry {
    pub selector: String,
    pub role: String,
}

fn default_workers() -> u32 {
    4
}

fn default_per_host() -> u32 {
    2
}

fn default_min_delay() -> u64 {
    250
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base() -> u64 {
    500
}

fn default_retry_max() -> u64 {
    8_000
}

fn default_timeout() -> u64 {
    30
}

fn default_redirect_limit() -> u32 {
    10
}

fn default_grace() -> u64 {
    10
}

fn default_true() -> bool {
    true
}
