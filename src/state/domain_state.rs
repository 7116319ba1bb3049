use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks the request history of one domain
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests started against this domain
    pub request_count: u32,

    /// Start time reserved for the most recent request
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, interval: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let ready_at = last + interval;
        if ready_at > now {
            Some(ready_at - now)
        } else {
            None
        }
    }

    /// Records a request starting at `at`
    pub fn record_request(&mut self, at: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(at);
    }
}

/// Spaces request starts to the same domain by a minimum interval
///
/// Workers reserve a start slot under a short lock and then sleep outside it,
/// so waiting on one domain never blocks workers bound for another.
#[derive(Debug, Default)]
pub struct DomainThrottle {
    interval: Duration,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl DomainThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Reserves the next start slot for `domain` and returns when it begins
    pub fn reserve(&self, domain: &str, now: Instant) -> Instant {
        let mut domains = self
            .domains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = domains.entry(domain.to_string()).or_default();

        let start = match state.time_until_next_request(self.interval, now) {
            Some(wait) => now + wait,
            None => now,
        };
        state.record_request(start);
        start
    }

    /// Waits until `domain` may receive another request
    pub async fn wait_turn(&self, domain: &str) {
        if self.interval.is_zero() {
            self.reserve(domain, Instant::now());
            return;
        }

        let start = self.reserve(domain, Instant::now());
        if start > Instant::now() {
            tracing::trace!("Throttling {} until its next slot", domain);
            tokio::time::sleep_until(start).await;
        }
    }

    /// Number of requests started against `domain`
    pub fn request_count(&self, domain: &str) -> u32 {
        self.domains
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(domain)
            .map(|state| state.request_count)
            .unwrap_or(0)
    }
}
