//! Site adapter: everything the pipeline needs to know about one documentation site
//!
//! The crawl core only talks to [`SiteAdapter`]. [`ConfiguredSite`] builds
//! one from the `[site]` table of the configuration file.

use crate::config::SiteConfig;
use crate::normalize::{Role, RoleOverride};
use crate::url::{normalize_url, CanonicalUrl};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// Content region selectors tried when the site does not configure any
const DEFAULT_CONTENT_SELECTORS: &[&str] = &["main article", "article", "main", "[role=main]", "body"];

/// Elements that never carry page content
const DEFAULT_CHROME_SELECTORS: &[&str] = &[
    "nav",
    "[role=navigation]",
    "script",
    "style",
    "noscript",
    "template",
    "iframe",
    "svg",
    "button",
    ".toc",
    ".table-of-contents",
    ".breadcrumbs",
];

/// Path suffixes that point at assets rather than documentation pages
const ASSET_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".pdf", ".zip", ".gz", ".tgz",
    ".css", ".js", ".json", ".xml", ".txt", ".mp4", ".webm", ".woff", ".woff2",
];

/// The contract between the crawl pipeline and a particular site
pub trait SiteAdapter: Send + Sync {
    /// Human-readable name used in every document title line
    fn name(&self) -> &str;

    /// Starting points of the crawl
    fn seeds(&self) -> &[CanonicalUrl];

    /// Whether a URL belongs to the site and is worth crawling
    fn accepts(&self, url: &CanonicalUrl) -> bool;

    /// Selectors tried in order to find the content region of a page
    fn content_selectors(&self) -> &[Selector];

    /// Selectors of navigation chrome stripped from the content region
    fn chrome_selectors(&self) -> &[Selector];

    /// Elements forced to a specific normalizer role
    fn role_overrides(&self) -> &[RoleOverride];

    /// Origin (`scheme://host[:port]`) whose pages get undecorated output names
    fn primary_origin(&self) -> &str;
}

/// Site adapter built from configuration
#[derive(Debug)]
pub struct ConfiguredSite {
    name: String,
    seeds: Vec<CanonicalUrl>,
    allowed_hosts: Vec<String>,
    include_prefixes: Vec<String>,
    exclude_prefixes: Vec<String>,
    content_selectors: Vec<Selector>,
    chrome_selectors: Vec<Selector>,
    role_overrides: Vec<RoleOverride>,
    primary_origin: String,
}

impl ConfiguredSite {
    /// Builds the adapter, parsing every seed, selector and role
    pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
        let seeds = config
            .seeds
            .iter()
            .map(|seed| {
                normalize_url(seed)
                    .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let first = seeds
            .first()
            .ok_or_else(|| ConfigError::Validation("at least one seed URL is required".to_string()))?;
        let primary_origin = origin_of(first);

        let mut allowed_hosts: Vec<String> = if config.allowed_hosts.is_empty() {
            seeds.iter().map(|s| s.host().to_string()).collect()
        } else {
            config.allowed_hosts.iter().map(|h| h.to_lowercase()).collect()
        };
        allowed_hosts.sort();
        allowed_hosts.dedup();

        let content_selectors = if config.content_selectors.is_empty() {
            parse_selectors(DEFAULT_CONTENT_SELECTORS.iter().copied())?
        } else {
            parse_selectors(config.content_selectors.iter().map(String::as_str))?
        };

        let chrome_selectors = parse_selectors(
            DEFAULT_CHROME_SELECTORS
                .iter()
                .copied()
                .chain(config.chrome_selectors.iter().map(String::as_str)),
        )?;

        let role_overrides = config
            .roles
            .iter()
            .map(|entry| {
                let role = Role::from_config_name(&entry.role).ok_or_else(|| {
                    ConfigError::Validation(format!("Unknown role '{}'", entry.role))
                })?;
                Ok(RoleOverride {
                    selector: parse_selector(&entry.selector)?,
                    role,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            name: config.name.clone(),
            seeds,
            allowed_hosts,
            include_prefixes: config.include_prefixes.clone(),
            exclude_prefixes: config.exclude_prefixes.clone(),
            content_selectors,
            chrome_selectors,
            role_overrides,
            primary_origin,
        })
    }

    fn host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }

    fn path_allowed(&self, path: &str) -> bool {
        if self
            .exclude_prefixes
            .iter()
            .any(|prefix| has_path_prefix(path, prefix))
        {
            return false;
        }

        self.include_prefixes.is_empty()
            || self
                .include_prefixes
                .iter()
                .any(|prefix| has_path_prefix(path, prefix))
    }
}

impl SiteAdapter for ConfiguredSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn seeds(&self) -> &[CanonicalUrl] {
        &self.seeds
    }

    fn accepts(&self, url: &CanonicalUrl) -> bool {
        let path = url.path().to_lowercase();
        if ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return false;
        }
        self.host_allowed(url.host()) && self.path_allowed(url.path())
    }

    fn content_selectors(&self) -> &[Selector] {
        &self.content_selectors
    }

    fn chrome_selectors(&self) -> &[Selector] {
        &self.chrome_selectors
    }

    fn role_overrides(&self) -> &[RoleOverride] {
        &self.role_overrides
    }

    fn primary_origin(&self) -> &str {
        &self.primary_origin
    }
}

/// Finds the first element matched by the selectors, trying them in order
pub fn content_region<'a>(document: &'a Html, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| document.select(selector).next())
}

/// `scheme://host[:port]` of a URL
pub fn origin_of(url: &CanonicalUrl) -> String {
    format!("{}://{}", url.as_url().scheme(), url.host_key())
}

/// Checks if a host matches a pattern
///
/// `*.example.com` matches `example.com` and any subdomain of it; any other
/// pattern must match exactly.
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Segment-aware prefix test: `/docs` covers `/docs` and `/docs/x` but not `/docsearch`
fn has_path_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn parse_selectors<'s>(raw: impl Iterator<Item = &'s str>) -> Result<Vec<Selector>, ConfigError> {
    raw.map(parse_selector).collect()
}

fn parse_selector(raw: &str) -> Result<Selector, ConfigError> {
    Selector::parse(raw).map_err(|e| ConfigError::InvalidSelector {
        selector: raw.to_string(),
        message: format!("{:?}", e),
    })
}
