//! Crawler module for fetching and processing pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] seam
//! - Parsing response bodies into documents
//! - Task lifecycle, errors and outcomes
//! - The bounded-concurrency scheduler that ties them together

mod fetcher;
mod parser;
mod scheduler;
mod task;

pub use fetcher::{build_http_client, user_agent_string, FetchError, Fetcher, HttpFetcher};
pub use parser::{parse_document, MalformedMarkup};
pub use scheduler::{InFlightGauge, Scheduler, SchedulerSettings};
pub use task::{
    BatchStats, CrawlBatchResult, CrawlTask, ErrorKind, OutcomeStatus, TaskError, TaskOutcome,
};

use crate::config::Config;
use crate::registry::SiteRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete batch with the settings from `config`
///
/// This is the main entry point for a crawl. It will:
/// 1. Compile every site's rules into the registry
/// 2. Build the HTTP client with the configured user agent
/// 3. Schedule and fetch every URL, extracting a record from each page
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `urls` - URLs to crawl, in submission order
/// * `cancel` - Cancels every unfinished task when triggered
///
/// # Returns
///
/// * `Ok(CrawlBatchResult)` - One outcome per URL, in submission order
/// * `Err(LadleError)` - The rules or the HTTP client could not be built
pub async fn crawl(
    config: &Config,
    urls: Vec<String>,
    cancel: CancellationToken,
) -> crate::Result<CrawlBatchResult> {
    let registry = Arc::new(SiteRegistry::from_config(&config.sites)?);
    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
    let scheduler = Scheduler::new(
        registry,
        fetcher,
        SchedulerSettings::from(&config.scheduler),
    );

    Ok(scheduler.run(urls, cancel).await)
}
