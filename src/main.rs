//! Ladle main entry point
//!
//! This is the command-line interface for the Ladle extraction pipeline.

use anyhow::Context;
use clap::Parser;
use ladle::config::{apply_overrides, load_config_with_hash, Config, SchedulerOverrides};
use ladle::crawler::{crawl, OutcomeStatus};
use ladle::output::{print_statistics, write_json, BatchStatistics};
use ladle::url::parse_task_url;
use ladle::SiteRegistry;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ladle: structured extraction from many sites at once
///
/// Ladle fetches every given URL concurrently, extracts fields with the
/// rule set registered for the URL's domain, and prints one JSON record or
/// failure per URL, in input order.
#[derive(Parser, Debug)]
#[command(name = "ladle")]
#[command(version)]
#[command(about = "Concurrent structured extraction from web pages", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to crawl
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Read additional URLs from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Override the configured number of workers
    #[arg(long)]
    concurrency: Option<u32>,

    /// Override the configured per-attempt timeout (milliseconds)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Override the configured retry limit
    #[arg(long)]
    max_retries: Option<u32>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Validate config and show how each URL resolves without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Exit status when every task produced a record
const EXIT_OK: u8 = 0;

/// Exit status when at least one task failed
const EXIT_TASK_FAILURES: u8 = 1;

/// Exit status for configuration and startup errors
const EXIT_STARTUP: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, urls) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    if cli.dry_run {
        return match handle_dry_run(&config, &urls) {
            Ok(()) => ExitCode::from(EXIT_OK),
            Err(e) => {
                tracing::error!("{:#}", e);
                ExitCode::from(EXIT_STARTUP)
            }
        };
    }

    match handle_crawl(&config, urls, cli.pretty, cli.quiet).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("Crawl failed: {:#}", e);
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so that stdout carries only the JSON result.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ladle=info,warn"),
            1 => EnvFilter::new("ladle=debug,info"),
            2 => EnvFilter::new("ladle=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration, applies overrides and collects the input URLs
fn prepare(cli: &Cli) -> anyhow::Result<(Config, Vec<String>)> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let overrides = SchedulerOverrides {
        concurrency: cli.concurrency,
        per_task_timeout_ms: cli.timeout_ms,
        max_retries: cli.max_retries,
    };
    apply_overrides(&mut config, &overrides).context("Invalid command-line override")?;

    let mut urls = cli.urls.clone();
    if let Some(path) = &cli.input {
        urls.extend(read_url_file(path)?);
    }
    anyhow::ensure!(!urls.is_empty(), "No URLs given");

    Ok((config, urls))
}

/// Reads one URL per line, skipping blank lines and `#` comments
fn read_url_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Handles the --dry-run mode: shows the registry and how each URL resolves
fn handle_dry_run(config: &Config, urls: &[String]) -> anyhow::Result<()> {
    let registry = SiteRegistry::from_config(&config.sites)?;

    println!("=== Ladle Dry Run ===\n");

    println!("Scheduler:");
    println!("  Concurrency: {}", config.scheduler.concurrency);
    println!(
        "  Per-task timeout: {}ms",
        config.scheduler.per_task_timeout_ms
    );
    println!("  Max retries: {}", config.scheduler.max_retries);
    println!(
        "  Backoff: {}ms doubling, capped at {}ms",
        config.scheduler.backoff_base_ms, config.scheduler.backoff_max_ms
    );
    println!(
        "  Min domain interval: {}ms",
        config.scheduler.min_domain_interval_ms
    );

    println!("\nUser Agent:");
    println!(
        "  {}",
        ladle::crawler::user_agent_string(&config.user_agent)
    );

    println!("\nRegistered Sites ({}):", registry.len());
    for site in &config.sites {
        println!(
            "  - {} ({} fields, {} groups)",
            site.domain.to_lowercase(),
            site.fields.len(),
            site.groups.len()
        );
    }

    println!("\nURLs ({}):", urls.len());
    for url in urls {
        let resolution = match parse_task_url(url) {
            Ok(parsed) => match registry.resolve(&parsed) {
                Ok(rules) => format!("-> {}", rules.domain),
                Err(e) => format!("!! {}", e),
            },
            Err(e) => format!("!! {}", e),
        };
        println!("  {} {}", url, resolution);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation and returns the exit status
async fn handle_crawl(
    config: &Config,
    urls: Vec<String>,
    pretty: bool,
    quiet: bool,
) -> anyhow::Result<u8> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling unfinished tasks");
            trigger.cancel();
        }
    });

    tracing::info!(
        "Crawling {} URLs across {} registered sites",
        urls.len(),
        config.sites.len()
    );

    let batch = crawl(config, urls, cancel).await?;

    write_json(std::io::stdout().lock(), &batch, pretty).context("Failed to write results")?;

    if !quiet {
        print_statistics(&BatchStatistics::from_batch(&batch));
    }

    if batch.all_succeeded() {
        return Ok(EXIT_OK);
    }

    for outcome in batch.failures() {
        if let Some(error) = outcome.error() {
            tracing::error!("{}: {}", outcome.url, error);
        }
    }
    tracing::warn!(
        "{} of {} URLs failed",
        batch.count(OutcomeStatus::Failed),
        batch.len()
    );

    Ok(EXIT_TASK_FAILURES)
}
