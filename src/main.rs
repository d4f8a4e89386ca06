//! Docs-Mirror main entry point
//!
//! This is the command-line interface for the Docs-Mirror documentation mirror.

use anyhow::{bail, Context};
use clap::Parser;
use docs_mirror::config::{load_config_with_hash, Config};
use docs_mirror::output::print_summary;
use docs_mirror::site::{ConfiguredSite, SiteAdapter};
use docs_mirror::Coordinator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Docs-Mirror: a deterministic documentation mirror
///
/// Docs-Mirror crawls a documentation site by following same-site links and
/// writes each page as a normalized Markdown file. Re-running it over
/// unchanged content leaves the output tree untouched.
#[derive(Parser, Debug)]
#[command(name = "docs-mirror")]
#[command(version = "1.0.0")]
#[command(about = "A deterministic documentation mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be mirrored without crawling
    #[arg(long)]
    dry_run: bool,

    /// Stop claiming new pages after this many
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    max_pages: Option<u64>,

    /// Write the mirror to this directory instead of the configured root
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = Some(max_pages as usize);
    }
    if let Some(output) = &cli.output {
        // An unset manifest path follows the new root
        config.output.root = output.display().to_string();
    }

    let site = Arc::new(ConfiguredSite::from_config(&config.site).context("Invalid [site] table")?);

    if cli.dry_run {
        handle_dry_run(&config, site.as_ref());
        return Ok(());
    }

    handle_crawl(config, site, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docs_mirror=info,warn"),
            1 => EnvFilter::new("docs_mirror=debug,info"),
            2 => EnvFilter::new("docs_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved plan
fn handle_dry_run(config: &Config, site: &dyn SiteAdapter) {
    println!("=== Docs-Mirror Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Workers: {}", crawler.workers);
    println!("  Max concurrent fetches: {}", crawler.fetch_concurrency());
    println!("  Per-host concurrency: {}", crawler.per_host_concurrency);
    println!("  Minimum delay: {}ms", crawler.minimum_delay_ms);
    println!(
        "  Retries: {} (backoff {}ms..{}ms)",
        crawler.max_retries, crawler.retry_base_delay_ms, crawler.retry_max_delay_ms
    );
    println!("  Respect robots.txt: {}", crawler.respect_robots);
    match crawler.max_pages {
        Some(max) => println!("  Page budget: {}", max),
        None => println!("  Page budget: none"),
    }
    match crawler.max_duration_secs {
        Some(secs) => println!("  Time budget: {}s", secs),
        None => println!("  Time budget: none"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Root: {}", config.output.root);
    println!("  Manifest: {}", config.output.manifest_path());
    println!("  On this page: {}", config.output.on_this_page);

    println!("\nSite: {}", site.name());
    println!("  Primary origin: {}", site.primary_origin());
    println!("  Seeds ({}):", site.seeds().len());
    for seed in site.seeds() {
        println!("    * {}", seed);
    }
    if !config.site.include_prefixes.is_empty() {
        println!("  Include prefixes: {}", config.site.include_prefixes.join(", "));
    }
    if !config.site.exclude_prefixes.is_empty() {
        println!("  Exclude prefixes: {}", config.site.exclude_prefixes.join(", "));
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the default mode: runs the mirror and prints its summary
async fn handle_crawl(config: Config, site: Arc<ConfiguredSite>, config_hash: String) -> anyhow::Result<()> {
    let coordinator = Coordinator::with_site(config, site).with_config_hash(config_hash);

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight pages");
            cancel.cancel();
        }
    });

    let manifest = coordinator.run().await.context("Mirror run failed")?;
    print_summary(&manifest);

    if manifest.is_fatal() {
        bail!("Mirror run ended with status {}", manifest.status);
    }
    Ok(())
}
