use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use crate::normalize::Role;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_site_config(&config.site)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.fetch_concurrency() < 1 {
        return Err(ConfigError::Validation(
            "max_concurrent_fetches must be >= 1".to_string(),
        ));
    }

    if config.per_host_concurrency < 1 || config.per_host_concurrency > config.workers {
        return Err(ConfigError::Validation(format!(
            "per_host_concurrency must be between 1 and workers ({}), got {}",
            config.workers, config.per_host_concurrency
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.retry_max_delay_ms < config.retry_base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry_max_delay_ms ({}) must be >= retry_base_delay_ms ({})",
            config.retry_max_delay_ms, config.retry_base_delay_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_duration_secs == Some(0) {
        return Err(ConfigError::Validation(
            "max_duration_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }

    if matches!(&config.manifest_path, Some(path) if path.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "manifest_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site table: seeds, host patterns, selectors and roles
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Site '{}' must have at least one seed URL",
            config.name
        )));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                seed
            )));
        }
    }

    for pattern in &config.allowed_hosts {
        validate_domain_pattern(pattern)?;
    }

    for prefix in config
        .include_prefixes
        .iter()
        .chain(config.exclude_prefixes.iter())
    {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "Path prefix '{}' must start with '/'",
                prefix
            )));
        }
    }

    for selector in config
        .content_selectors
        .iter()
        .chain(config.chrome_selectors.iter())
    {
        validate_selector(selector)?;
    }

    for entry in &config.roles {
        validate_selector(&entry.selector)?;
        if Role::from_config_name(&entry.role).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown role '{}' for selector '{}'",
                entry.role, entry.selector
            )));
        }
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)?;
    } else {
        validate_domain_string(pattern)?;
    }

    Ok(())
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') && domain != "localhost" {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoleEntry;

    fn site() -> SiteConfig {
        SiteConfig {
            name: "Docs".to_string(),
            seeds: vec!["https://docs.example.com/".to_string()],
            allowed_hosts: vec![],
            include_prefixes: vec![],
            exclude_prefixes: vec![],
            content_selectors: vec![],
            chrome_selectors: vec![],
            roles: vec![],
        }
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("localhost").is_ok());
        assert!(validate_domain_pattern("127.0.0.1").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("example").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
        assert!(validate_domain_pattern("example.com.").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@domain").is_err());
    }

    #[test]
    fn test_site_requires_seeds() {
        let mut config = site();
        config.seeds.clear();
        assert!(validate_site_config(&config).is_err());
    }

    #[test]
    fn test_site_rejects_non_http_seed() {
        let mut config = site();
        config.seeds = vec!["ftp://docs.example.com/".to_string()];
        assert!(validate_site_config(&config).is_err());
    }

    #[test]
    fn test_site_rejects_bad_selector() {
        let mut config = site();
        config.content_selectors = vec!["main >>> ???".to_string()];
        assert!(matches!(
            validate_site_config(&config),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_site_rejects_unknown_role() {
        let mut config = site();
        config.roles = vec![RoleEntry {
            selector: ".box".to_string(),
            role: "sparkle".to_string(),
        }];
        assert!(validate_site_config(&config).is_err());
    }

    #[test]
    fn test_prefix_must_be_absolute() {
        let mut config = site();
        config.include_prefixes = vec!["docs".to_string()];
        assert!(validate_site_config(&config).is_err());
    }

    #[test]
    fn test_retry_delays_ordered() {
        let config = CrawlerConfig {
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 10,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());
    }
}
