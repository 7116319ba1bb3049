//! Crawl scheduler with bounded concurrency and failure isolation
//!
//! This module handles:
//! - A fixed pool of workers draining a shared task queue
//! - Per-attempt deadlines and exponential backoff for transient failures
//! - Per-domain request spacing
//! - Batch-wide cancellation
//! - Collecting outcomes back into submission order
//!
//! Each worker owns one task at a time. Parsing, extraction and assembly run
//! synchronously inside the worker, so a parsed document never outlives the
//! attempt that produced it.

use crate::config::SchedulerConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::parse_document;
use crate::crawler::task::{
    BatchStats, CrawlBatchResult, CrawlTask, ErrorKind, TaskError, TaskOutcome,
};
use crate::extract::{assemble, extract_all, Record};
use crate::registry::SiteRegistry;
use crate::rules::SiteRuleSet;
use crate::state::DomainThrottle;
use crate::url::parse_task_url;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Runtime limits for one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Worker pool size; at most this many tasks are in flight
    pub concurrency: usize,

    /// Deadline for a single fetch attempt
    pub per_task_timeout: Duration,

    /// Retries allowed after the first attempt
    pub max_retries: u32,

    pub backoff_base: Duration,
    pub backoff_max: Duration,

    /// Minimum spacing between request starts to one domain
    pub min_domain_interval: Duration,
}

impl SchedulerSettings {
    /// Delay before the given retry (1-based): `base * 2^(retry - 1)`, capped
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_max)
    }
}

impl From<&SchedulerConfig> for SchedulerSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            concurrency: config.concurrency as usize,
            per_task_timeout: Duration::from_millis(config.per_task_timeout_ms),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            min_domain_interval: Duration::from_millis(config.min_domain_interval_ms),
        }
    }
}

/// Counts tasks currently in flight and remembers the peak
#[derive(Debug, Default)]
pub struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    /// Marks one task in flight until the returned guard is dropped
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { gauge: self }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard<'a> {
    gauge: &'a InFlightGauge,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Dispatches crawl tasks over a bounded worker pool
///
/// The scheduler itself holds only immutable collaborators; all per-batch
/// state lives in [`Scheduler::run`], so one scheduler can run several
/// batches.
pub struct Scheduler {
    registry: Arc<SiteRegistry>,
    fetcher: Arc<dyn Fetcher>,
    settings: SchedulerSettings,
}

/// State shared by the workers of one batch
struct Batch {
    registry: Arc<SiteRegistry>,
    fetcher: Arc<dyn Fetcher>,
    settings: SchedulerSettings,
    queue: Mutex<VecDeque<CrawlTask>>,
    throttle: DomainThrottle,
    gauge: InFlightGauge,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        registry: Arc<SiteRegistry>,
        fetcher: Arc<dyn Fetcher>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            registry,
            fetcher,
            settings,
        }
    }

    /// Runs one batch to completion
    ///
    /// Every input URL yields exactly one outcome, in submission order,
    /// regardless of the order in which tasks finish. Cancelling `cancel`
    /// ends every unfinished task as `Cancelled` promptly.
    ///
    /// # Arguments
    ///
    /// * `urls` - URLs to crawl, in submission order
    /// * `cancel` - Batch-wide cancellation signal
    pub async fn run(&self, urls: Vec<String>, cancel: CancellationToken) -> CrawlBatchResult {
        let started = Instant::now();
        let total = urls.len();

        let queue: VecDeque<CrawlTask> = urls
            .iter()
            .enumerate()
            .map(|(index, url)| CrawlTask::new(index, url.clone()))
            .collect();

        let batch = Arc::new(Batch {
            registry: Arc::clone(&self.registry),
            fetcher: Arc::clone(&self.fetcher),
            settings: self.settings.clone(),
            queue: Mutex::new(queue),
            throttle: DomainThrottle::new(self.settings.min_domain_interval),
            gauge: InFlightGauge::default(),
            cancel,
        });

        let worker_count = self.settings.concurrency.max(1).min(total);
        tracing::info!(
            "Starting batch of {} tasks with {} workers",
            total,
            worker_count
        );

        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(run_worker(id, Arc::clone(&batch), results_tx.clone()));
        }
        // The channel closes once every worker has exited
        drop(results_tx);

        let mut slots: Vec<Option<TaskOutcome>> = (0..total).map(|_| None).collect();
        while let Some(outcome) = results_rx.recv().await {
            let index = outcome.index;
            slots[index] = Some(outcome);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker exited abnormally: {}", e);
            }
        }

        let outcomes: Vec<TaskOutcome> = slots
            .into_iter()
            .zip(urls)
            .enumerate()
            .map(|(index, (slot, url))| {
                slot.unwrap_or_else(|| {
                    CrawlTask::new(index, url).fail(TaskError::new(
                        ErrorKind::Cancelled,
                        "worker stopped before the task finished",
                    ))
                })
            })
            .collect();

        let stats = BatchStats {
            peak_in_flight: batch.gauge.peak(),
            total_attempts: outcomes.iter().map(|o| o.attempts).sum(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Batch finished: {} tasks, {} attempts, peak {} in flight, {:?}",
            total,
            stats.total_attempts,
            stats.peak_in_flight,
            stats.elapsed
        );

        CrawlBatchResult { outcomes, stats }
    }
}

async fn run_worker(id: usize, batch: Arc<Batch>, results: mpsc::UnboundedSender<TaskOutcome>) {
    loop {
        let next = batch
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let Some(task) = next else {
            break;
        };

        let outcome = if batch.cancel.is_cancelled() {
            task.fail(TaskError::cancelled())
        } else {
            batch.process(task).await
        };

        match &outcome.result {
            Ok(record) if record.is_complete() => {
                tracing::debug!("{}: complete", outcome.url)
            }
            Ok(record) => tracing::info!(
                "{}: partial, missing {:?}",
                outcome.url,
                record.completeness.missing_fields()
            ),
            Err(error) => tracing::warn!("{}: failed: {}", outcome.url, error),
        }

        if results.send(outcome).is_err() {
            break;
        }
    }

    tracing::trace!("Worker {} finished", id);
}

impl Batch {
    /// Drives one task to a terminal state
    async fn process(&self, mut task: CrawlTask) -> TaskOutcome {
        let url = match parse_task_url(&task.url) {
            Ok(url) => url,
            Err(e) => return task.fail(TaskError::new(ErrorKind::InvalidUrl, e.to_string())),
        };

        let rules = match self.registry.resolve(&url) {
            Ok(rules) => rules,
            Err(e) => return task.fail(TaskError::new(ErrorKind::NotRegistered, e.to_string())),
        };

        loop {
            let error = match self.attempt(&mut task, &url, &rules).await {
                Ok(record) => return task.succeed(record),
                Err(error) => error,
            };

            if !error.kind.is_retryable() || task.retries() >= self.settings.max_retries {
                return task.fail(error);
            }

            let retry = task.retries() + 1;
            let delay = self.settings.backoff_for(retry);
            tracing::warn!(
                "{}: {}; retry {}/{} in {:?}",
                task.url,
                error,
                retry,
                self.settings.max_retries,
                delay
            );
            task.mark_retrying();

            tokio::select! {
                _ = self.cancel.cancelled() => return task.fail(TaskError::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One fetch-and-extract attempt, bounded by the task's deadline
    async fn attempt(
        &self,
        task: &mut CrawlTask,
        url: &Url,
        rules: &SiteRuleSet,
    ) -> Result<Record, TaskError> {
        tokio::select! {
            _ = self.cancel.cancelled() => return Err(TaskError::cancelled()),
            _ = self.throttle.wait_turn(&rules.domain) => {}
        }

        let timeout = self.settings.per_task_timeout;
        let deadline = task.begin_attempt(timeout);
        let _in_flight = self.gauge.enter();
        tracing::debug!("Fetching {} (attempt {})", url, task.attempts);

        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(TaskError::cancelled()),
            fetched = tokio::time::timeout_at(deadline, self.fetcher.fetch(url, timeout)) => {
                match fetched {
                    Ok(Ok(body)) => body,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => return Err(TaskError::timeout(timeout)),
                }
            }
        };

        extract_record(&body, rules)
    }
}

/// Parses, extracts and assembles synchronously; the document is dropped here
fn extract_record(body: &str, rules: &SiteRuleSet) -> Result<Record, TaskError> {
    let document = parse_document(body)?;
    let extraction = extract_all(&document, rules);
    Ok(assemble(rules, &extraction))
}
