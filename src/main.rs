//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest page harvester.

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use sumi_harvest::config::{load_config_with_hash, validate, Config, ExtractorKind};
use sumi_harvest::extract::{ListingExtractor, PageExtractor};
use sumi_harvest::fetch::{harvest_with, BatchReport, Diagnostics};
use sumi_harvest::output::{print_summary, CsvSink, Sink};
use sumi_harvest::HarvestError;
use tracing_subscriber::EnvFilter;

/// Config file picked up when none is given on the command line
const DEFAULT_CONFIG: &str = "pyproject.toml";

/// Sumi-Harvest: a bounded-concurrency page harvester
///
/// Fetches every configured URL with at most `max-concurrent` requests in
/// flight, rotating user agents and proxies, backing off from rate limits,
/// and writes one CSV row per fetched page.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded-concurrency page harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults to ./pyproject.toml if present)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Additional URL to fetch; may be repeated
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Override the CSV output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_configuration(cli.config.as_deref())?;

    // Command-line overrides
    config.urls.extend(cli.urls);
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    validate(&config).context("invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

/// Loads the explicit config, the default pyproject.toml, or built-in defaults
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG).exists() => PathBuf::from(DEFAULT_CONFIG),
        None => {
            tracing::info!("No configuration file found, using defaults");
            return Ok(Config::default());
        }
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Handles the --dry-run mode: shows the resolved settings and URLs
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Fetch Configuration:");
    println!("  Max concurrent: {}", config.max_concurrent);
    println!("  Max retries: {}", config.max_retries);
    println!("  Backoff base: {}s", config.backoff_base_seconds);
    println!(
        "  Jitter: {}s - {}s",
        config.jitter_min_seconds, config.jitter_max_seconds
    );
    println!("  Request timeout: {}s", config.request_timeout_seconds);
    match config.deadline_seconds {
        Some(deadline) => println!("  Batch deadline: {}s", deadline),
        None => println!("  Batch deadline: none"),
    }
    println!("  Status policy: {:?}", config.status_policy);
    println!("  Extractor: {:?}", config.extractor);
    println!("  Headless: {}", config.headless);

    println!("\nIdentity:");
    match &config.user_agents {
        Some(agents) => println!("  User agents: {} configured", agents.len()),
        None => println!("  User agents: built-in browser pool"),
    }
    println!("  Proxies ({}):", config.proxies.len());
    for proxy in &config.proxies {
        println!("    - {}", proxy);
    }

    println!("\nOutput: {}", config.output_path.display());

    if let (Some(template), Some(pages)) = (&config.base_url, config.max_pages) {
        println!("\nPagination: {} over pages 1..={}", template, pages);
    }

    let urls = config.target_urls();
    println!("\nURLs ({}):", urls.len());
    for url in &urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    let urls = config.target_urls();
    if urls.is_empty() {
        tracing::warn!("No URLs configured, nothing to fetch");
        return Ok(());
    }

    tracing::info!(
        "Harvesting {} URLs (max concurrent: {}, max retries: {}, proxies: {})",
        urls.len(),
        config.max_concurrent,
        config.max_retries,
        config.proxies.len()
    );

    match config.extractor {
        ExtractorKind::Page => {
            let report = harvest_with(&config, PageExtractor::new(), Diagnostics::new()).await?;
            let records = report.results.records().cloned().collect::<Vec<_>>();
            finish(&config, &report, &records)
        }
        ExtractorKind::Listing => {
            let report =
                harvest_with(&config, ListingExtractor::new(), Diagnostics::new()).await?;
            // Product cards are flattened across pages, keeping page order
            let products = report.results.records().flatten().cloned().collect::<Vec<_>>();
            finish(&config, &report, &products)
        }
    }
}

/// Prints the summary, writes the CSV and reports a blown deadline
fn finish<R, T: Serialize>(
    config: &Config,
    report: &BatchReport<R>,
    rows: &[T],
) -> anyhow::Result<()> {
    print_summary(report);

    let mut sink = CsvSink::new(&config.output_path);
    sink.persist(rows)
        .map_err(HarvestError::Output)
        .with_context(|| format!("failed to write {}", config.output_path.display()))?;

    if report.deadline_exceeded {
        let seconds = config.deadline_seconds.unwrap_or_default();
        tracing::error!("Batch deadline of {}s exceeded", seconds);
        return Err(HarvestError::DeadlineExceeded { seconds }.into());
    }

    tracing::info!("Harvest completed successfully");
    Ok(())
}
