//! Crawl tasks, their errors and their outcomes
//!
//! A [`CrawlTask`] is owned by exactly one worker at a time. When it reaches
//! a terminal state it is consumed into a [`TaskOutcome`], which cannot be
//! changed afterwards.

use crate::extract::Record;
use crate::state::TaskState;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Classification of a task failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No rule set is registered for the URL's domain
    NotRegistered,

    /// The input could not be parsed as an HTTP(S) URL
    InvalidUrl,

    /// The fetch did not finish before the task's deadline
    FetchTimeout,

    /// Connection refused, reset, DNS failure, or a truncated body
    FetchConnectionError,

    /// The server answered 4xx
    HttpClientError(u16),

    /// The server answered 5xx
    HttpServerError(u16),

    /// The redirect chain was too long or looped
    TooManyRedirects,

    /// The body is not usable HTML
    MalformedMarkup,

    /// The batch was cancelled before the task finished
    Cancelled,
}

impl ErrorKind {
    /// Returns true if another attempt may succeed
    ///
    /// Timeouts, connection errors and server errors are transient; every
    /// other kind fails the same way on each attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout | Self::FetchConnectionError | Self::HttpServerError(_)
        )
    }

    /// Classifies an HTTP status code that is not a success
    pub fn from_status(code: u16) -> Self {
        if code >= 500 {
            Self::HttpServerError(code)
        } else {
            Self::HttpClientError(code)
        }
    }

    /// The HTTP status carried by this kind, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpClientError(code) | Self::HttpServerError(code) => Some(*code),
            _ => None,
        }
    }

    /// Stable snake_case name used in output and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRegistered => "not_registered",
            Self::InvalidUrl => "invalid_url",
            Self::FetchTimeout => "fetch_timeout",
            Self::FetchConnectionError => "fetch_connection_error",
            Self::HttpClientError(_) => "http_client_error",
            Self::HttpServerError(_) => "http_server_error",
            Self::TooManyRedirects => "too_many_redirects",
            Self::MalformedMarkup => "malformed_markup",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code() {
            Some(code) => write!(f, "{}({})", self.as_str(), code),
            None => write!(f, "{}", self.as_str()),
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A task failure with its classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "batch was cancelled")
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self::new(
            ErrorKind::FetchTimeout,
            format!("no response within {}ms", timeout.as_millis()),
        )
    }
}

/// One URL's lifecycle through fetch, parse, extract and assemble
#[derive(Debug)]
pub struct CrawlTask {
    /// Position in the submitted batch
    pub index: usize,

    pub url: String,

    /// Attempts started so far (the first attempt is not a retry)
    pub attempts: u32,

    /// Deadline of the current attempt
    pub deadline: Option<Instant>,

    state: TaskState,
}

impl CrawlTask {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            attempts: 0,
            deadline: None,
            state: TaskState::Queued,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Retries started so far
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    fn transition(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid task transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
    }

    /// Starts a new attempt and returns its deadline
    pub fn begin_attempt(&mut self, timeout: Duration) -> Instant {
        self.transition(TaskState::InFlight);
        self.attempts += 1;
        let deadline = Instant::now() + timeout;
        self.deadline = Some(deadline);
        deadline
    }

    /// Moves an in-flight task into backoff
    pub fn mark_retrying(&mut self) {
        self.transition(TaskState::Retrying);
        self.deadline = None;
    }

    /// Ends the task with a record
    pub fn succeed(mut self, record: Record) -> TaskOutcome {
        self.transition(TaskState::Succeeded);
        self.into_outcome(Ok(record))
    }

    /// Ends the task with an error
    pub fn fail(mut self, error: TaskError) -> TaskOutcome {
        self.transition(TaskState::Failed);
        self.into_outcome(Err(error))
    }

    fn into_outcome(self, result: Result<Record, TaskError>) -> TaskOutcome {
        TaskOutcome {
            index: self.index,
            url: self.url,
            attempts: self.attempts,
            result,
        }
    }
}

/// Terminal status of a task as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Complete,
    Partial,
    Failed,
}

/// Terminal result of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub index: usize,
    pub url: String,
    pub attempts: u32,
    pub result: Result<Record, TaskError>,
}

impl TaskOutcome {
    pub fn status(&self) -> OutcomeStatus {
        match &self.result {
            Ok(record) if record.is_complete() => OutcomeStatus::Complete,
            Ok(_) => OutcomeStatus::Partial,
            Err(_) => OutcomeStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn record(&self) -> Option<&Record> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&TaskError> {
        self.result.as_ref().err()
    }
}

/// Counters collected while a batch runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Highest number of tasks in flight at the same time
    pub peak_in_flight: usize,

    /// Attempts started across all tasks
    pub total_attempts: u32,

    pub elapsed: Duration,
}

/// Outcomes of a batch in submission order
#[derive(Debug, Clone, Default)]
pub struct CrawlBatchResult {
    pub outcomes: Vec<TaskOutcome>,
    pub stats: BatchStats,
}

impl CrawlBatchResult {
    /// Returns true if no task failed (partial records count as success)
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status() == status).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
