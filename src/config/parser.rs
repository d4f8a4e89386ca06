use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded in the run manifest so two runs can be compared
/// knowing whether they used the same settings.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID: &str = r#"
[crawler]
workers = 8
max-retries = 2
max-pages = 100

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
root = "./mirror"

[site]
name = "Example Docs"
seeds = ["https://docs.example.com/docs/"]
content-selectors = ["main article"]

[[site.roles]]
selector = "div.note-box"
role = "callout-info"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.workers, 8);
        assert_eq!(config.crawler.max_retries, 2);
        assert_eq!(config.crawler.max_pages, Some(100));
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
        assert_eq!(config.site.seeds.len(), 1);
        assert_eq!(config.site.roles[0].role, "callout-info");
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse_config(VALID).unwrap();

        assert_eq!(config.crawler.per_host_concurrency, 2);
        assert_eq!(config.crawler.retry_base_delay_ms, 500);
        assert_eq!(config.crawler.fetch_concurrency(), 8);
        assert!(config.crawler.respect_robots);
        assert!(!config.output.on_this_page);
        assert_eq!(config.output.manifest_path(), "./mirror/crawl-manifest.json");
    }

    #[test]
    fn test_missing_crawler_table_uses_defaults() {
        let content = VALID.replace("[crawler]\nworkers = 8\nmax-retries = 2\nmax-pages = 100\n", "");
        let config = parse_config(&content).unwrap();
        assert_eq!(config.crawler.workers, 4);
        assert_eq!(config.crawler.max_retries, 3);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/mirror.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID.replace("workers = 8", "workers = 0");
        let result = parse_config(&content);
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
