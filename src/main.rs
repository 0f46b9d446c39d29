//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest product scraper.

use anyhow::Context;
use clap::Parser;
use listing_harvest::config::{load_config_with_hash, Config, FetchStrategy};
use listing_harvest::harvest::{resolve_worker_count, Coordinator};
use listing_harvest::output::{default_output_path, print_summary, JsonFileOutput, OutputHandler};
use listing_harvest::url::build_search_url;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: a paginated product-listing scraper
///
/// Listing-Harvest runs a search against a storefront, harvests every result
/// page in parallel and writes the extracted product records as a JSON array.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A paginated product-listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Search term to harvest
    #[arg(value_name = "TERM")]
    term: String,

    /// Output file (defaults to the search term with spaces replaced by underscores)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the search that would run without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.term));

    if cli.dry_run {
        handle_dry_run(&config, &cli.term, &output_path)
    } else {
        handle_harvest(config, &cli.term, output_path).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the search that would run
fn handle_dry_run(config: &Config, term: &str, output_path: &Path) -> anyhow::Result<()> {
    let search_url = build_search_url(&config.search, term)?;

    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Search:");
    println!("  Term: {}", term.trim());
    println!("  First page: {}", search_url);
    match config.search.max_pages {
        Some(cap) => println!("  Max pages: {}", cap),
        None => println!("  Max pages: unlimited"),
    }

    println!("\nFetch:");
    match config.fetch.strategy {
        FetchStrategy::Direct => {
            println!("  Strategy: direct");
            println!("  User agents: {}", config.fetch.user_agents.len());
            println!("  Jitter: {}ms", config.fetch.jitter_ms);
        }
        FetchStrategy::Proxy => {
            println!("  Strategy: proxy");
            println!(
                "  Endpoint: {}",
                config.fetch.proxy_endpoint.as_deref().unwrap_or_default()
            );
        }
    }
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Retry delay: {}s", config.fetch.retry_delay_secs);
    println!("  Timeout: {}s", config.fetch.timeout_secs);

    println!("\nRun:");
    println!(
        "  Workers: {}",
        resolve_worker_count(config.concurrency.max_workers)
    );
    println!("  Detail pages: {}", config.run.detail_pages);
    println!("  Abort on page failure: {}", config.run.abort_on_page_failure);
    println!(
        "  Soft-failure rules: {}",
        if config.soft_failure.is_empty() {
            "built-in".to_string()
        } else {
            config.soft_failure.len().to_string()
        }
    );

    println!("\nOutput: {}", output_path.display());
    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main harvest operation
///
/// The output file is written with whatever was gathered, even when some
/// pages (or the first page) failed.
async fn handle_harvest(config: Config, term: &str, output_path: PathBuf) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config).context("failed to set up the harvester")?;
    tracing::info!("Using {} workers", coordinator.worker_count());

    let outcome = coordinator.search(term).await?;

    let sink = JsonFileOutput::new(output_path);
    sink.write_records(&outcome.records)
        .with_context(|| format!("failed to write {}", sink.describe()))?;

    outcome.summary.log();
    print_summary(&outcome.summary);

    Ok(())
}
