/// Task state definitions for tracking crawl progress
///
/// A crawl task moves `Queued → InFlight → (Succeeded | Failed | Retrying → InFlight)`.
/// Terminal states are final.
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    // ===== Active States =====
    /// Task is waiting for a worker
    Queued,

    /// Task holds a worker and is fetching or extracting
    InFlight,

    /// Task failed with a retryable error and is waiting out its backoff
    Retrying,

    // ===== Terminal States =====
    /// A record was assembled (complete or partial)
    Succeeded,

    /// The task ended with an error
    Failed,
}

impl TaskState {
    /// Returns true if this is a terminal state (no further processing)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::InFlight)
                | (Self::Queued, Self::Failed)
                | (Self::InFlight, Self::Succeeded)
                | (Self::InFlight, Self::Failed)
                | (Self::InFlight, Self::Retrying)
                | (Self::Retrying, Self::InFlight)
                | (Self::Retrying, Self::Failed)
        )
    }

    /// Stable lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible task states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Queued,
            Self::InFlight,
            Self::Retrying,
            Self::Succeeded,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
