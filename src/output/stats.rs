//! Statistics summary of a finished batch
//!
//! This module condenses a [`CrawlBatchResult`] into counts by status, by
//! failure kind and by missing field, and prints them for a human reader.

use crate::crawler::{CrawlBatchResult, OutcomeStatus};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

/// Batch statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStatistics {
    /// Number of URLs submitted
    pub total: usize,

    pub complete: usize,
    pub partial: usize,
    pub failed: usize,

    /// Failed tasks by error kind
    pub failures_by_kind: BTreeMap<String, usize>,

    /// Partial records by missing required name
    pub missing_by_field: BTreeMap<String, usize>,

    /// Attempts started across all tasks
    pub total_attempts: u32,

    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

impl BatchStatistics {
    /// Collects statistics from a finished batch
    pub fn from_batch(batch: &CrawlBatchResult) -> Self {
        let mut stats = Self {
            total: batch.len(),
            total_attempts: batch.stats.total_attempts,
            peak_in_flight: batch.stats.peak_in_flight,
            elapsed: batch.stats.elapsed,
            ..Self::default()
        };

        for outcome in &batch.outcomes {
            match outcome.status() {
                OutcomeStatus::Complete => stats.complete += 1,
                OutcomeStatus::Partial => stats.partial += 1,
                OutcomeStatus::Failed => stats.failed += 1,
            }

            if let Some(error) = outcome.error() {
                *stats
                    .failures_by_kind
                    .entry(error.kind.to_string())
                    .or_insert(0) += 1;
            }

            if let Some(record) = outcome.record() {
                for name in record.completeness.missing_fields() {
                    *stats.missing_by_field.entry(name.clone()).or_insert(0) += 1;
                }
            }
        }

        stats
    }

    /// Share of tasks that produced a record, complete or partial
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.complete + self.partial) as f64 / self.total as f64 * 100.0
    }
}

/// Formats statistics as a multi-line report
pub fn format_statistics(stats: &BatchStatistics) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "=== Batch Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  URLs submitted: {}", stats.total);
    let _ = writeln!(out, "  Attempts: {}", stats.total_attempts);
    let _ = writeln!(out, "  Peak in flight: {}", stats.peak_in_flight);
    let _ = writeln!(out, "  Elapsed: {:.2}s", stats.elapsed.as_secs_f64());
    let _ = writeln!(out);

    let _ = writeln!(out, "Outcomes:");
    for (label, count) in [
        ("complete", stats.complete),
        ("partial", stats.partial),
        ("failed", stats.failed),
    ] {
        let percentage = if stats.total > 0 {
            count as f64 / stats.total as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", label, count, percentage);
    }
    let _ = writeln!(out);

    if !stats.failures_by_kind.is_empty() {
        let _ = writeln!(out, "Failures by Kind:");
        let mut kinds: Vec<_> = stats.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (kind, count) in kinds {
            let _ = writeln!(out, "  {}: {}", kind, count);
        }
        let _ = writeln!(out);
    }

    if !stats.missing_by_field.is_empty() {
        let _ = writeln!(out, "Missing Fields:");
        let mut fields: Vec<_> = stats.missing_by_field.iter().collect();
        fields.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (field, count) in fields {
            let _ = writeln!(out, "  {}: {}", field, count);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} URLs produced a record)",
        stats.success_rate(),
        stats.complete + stats.partial,
        stats.total
    );

    out
}

/// Prints statistics to stderr, keeping stdout free for JSON
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &BatchStatistics) {
    eprint!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{BatchStats, CrawlTask, ErrorKind, TaskError};
    use crate::extract::{Completeness, Record};

    fn batch() -> CrawlBatchResult {
        let partial = |index: usize, missing: &[&str]| {
            let mut task = CrawlTask::new(index, format!("https://a.example.com/{}", index));
            task.begin_attempt(Duration::from_secs(1));
            task.succeed(Record {
                fields: vec![],
                groups: vec![],
                completeness: Completeness::Partial {
                    missing: missing.iter().map(|s| s.to_string()).collect(),
                },
            })
        };

        CrawlBatchResult {
            outcomes: vec![
                partial(0, &["name"]),
                partial(1, &["name", "nutrition"]),
                CrawlTask::new(2, "https://b.example.com/")
                    .fail(TaskError::new(ErrorKind::NotRegistered, "nope")),
                CrawlTask::new(3, "https://a.example.com/404")
                    .fail(TaskError::new(ErrorKind::HttpClientError(404), "HTTP status 404")),
            ],
            stats: BatchStats {
                peak_in_flight: 2,
                total_attempts: 3,
                elapsed: Duration::from_millis(1500),
            },
        }
    }

    #[tokio::test]
    async fn test_statistics_from_batch() {
        let stats = BatchStatistics::from_batch(&batch());

        assert_eq!(stats.total, 4);
        assert_eq!(stats.complete, 0);
        assert_eq!(stats.partial, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.failures_by_kind.get("not_registered"), Some(&1));
        assert_eq!(stats.failures_by_kind.get("http_client_error(404)"), Some(&1));
        assert_eq!(stats.missing_by_field.get("name"), Some(&2));
        assert_eq!(stats.missing_by_field.get("nutrition"), Some(&1));
        assert_eq!(stats.peak_in_flight, 2);
        assert!((stats.success_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_format_statistics() {
        let report = format_statistics(&BatchStatistics::from_batch(&batch()));

        assert!(report.contains("URLs submitted: 4"));
        assert!(report.contains("partial: 2 (50.0%)"));
        assert!(report.contains("Failures by Kind:"));
        assert!(report.contains("  name: 2"));
        assert!(report.contains("Success Rate: 50.0%"));
    }

    #[test]
    fn test_empty_batch_statistics() {
        let stats = BatchStatistics::from_batch(&CrawlBatchResult::default());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate(), 0.0);
        assert!(!format_statistics(&stats).contains("Failures by Kind"));
    }
}
