//! Wait specifications
//!
//! A [`WaitSpec`] describes one polling operation: which states keep the
//! loop going, which end it successfully, which end it with a failure, and
//! how long and how often to poll. Build one per Create/Update/Delete call
//! and drop it when the wait returns.

use std::collections::HashSet;
use std::time::Duration;

/// Consecutive not-found probes tolerated before a wait gives up
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// First sleep of the backoff cadence
pub const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound of the backoff cadence
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// What a not-found probe means for a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// The resource being gone is the goal (deletion waiters)
    Success,
    /// Tolerate this many consecutive not-found probes, then fail
    Retry(u32),
    /// Fail on the first not-found probe
    Fail,
}

impl Default for NotFoundPolicy {
    fn default() -> Self {
        NotFoundPolicy::Retry(DEFAULT_NOT_FOUND_CHECKS)
    }
}

/// Bucket a status falls into for a given spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Pending,
    Target,
    Failure,
    Unexpected,
}

/// Configuration for a single status wait
#[derive(Debug, Clone)]
pub struct WaitSpec {
    /// States that keep the loop polling
    pub pending: Vec<String>,
    /// States that end the wait successfully
    pub target: Vec<String>,
    /// States that end the wait with a failure
    pub failure: Vec<String>,
    /// Overall budget, including the initial delay
    pub timeout: Duration,
    /// Sleep before the first probe
    pub delay: Duration,
    /// Smallest allowed gap between two probes
    pub min_interval: Duration,
    /// Fixed gap between probes; backoff is used when unset
    pub poll_interval: Option<Duration>,
    pub not_found: NotFoundPolicy,
    /// Consecutive target observations required before succeeding
    pub continuous_target_occurrence: u32,
}

impl WaitSpec {
    /// Create a spec with the given overall timeout and no states
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Vec::new(),
            target: Vec::new(),
            failure: Vec::new(),
            timeout,
            delay: Duration::ZERO,
            min_interval: Duration::ZERO,
            poll_interval: None,
            not_found: NotFoundPolicy::default(),
            continuous_target_occurrence: 1,
        }
    }

    pub fn with_pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_failure<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failure = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Poll on a fixed cadence instead of backing off
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }

    /// Treat the resource disappearing as reaching the target
    pub fn target_not_found(self) -> Self {
        self.with_not_found(NotFoundPolicy::Success)
    }

    pub fn with_continuous_target_occurrence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrence = occurrences;
        self
    }

    pub fn classify(&self, state: &str) -> Classification {
        if self.target.iter().any(|s| s == state) {
            Classification::Target
        } else if self.failure.iter().any(|s| s == state) {
            Classification::Failure
        } else if self.pending.iter().any(|s| s == state) {
            Classification::Pending
        } else {
            Classification::Unexpected
        }
    }

    /// Check the invariants a wait relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }

        if self.continuous_target_occurrence == 0 {
            return Err("continuous target occurrence must be at least 1".to_string());
        }

        if self.target.is_empty() && self.not_found != NotFoundPolicy::Success {
            return Err(
                "no target states given and a missing resource is not treated as success"
                    .to_string(),
            );
        }

        if let Some(interval) = self.poll_interval {
            if interval.is_zero() && self.min_interval.is_zero() {
                return Err("poll interval must be greater than zero".to_string());
            }
        }

        let pending: HashSet<&str> = self.pending.iter().map(String::as_str).collect();
        let target: HashSet<&str> = self.target.iter().map(String::as_str).collect();
        let failure: HashSet<&str> = self.failure.iter().map(String::as_str).collect();

        let overlaps = [
            ("target", "failure", target.intersection(&failure)),
            ("pending", "target", pending.intersection(&target)),
            ("pending", "failure", pending.intersection(&failure)),
        ];
        for (left, right, common) in overlaps {
            let mut common: Vec<&str> = common.copied().collect();
            if !common.is_empty() {
                common.sort_unstable();
                return Err(format!(
                    "{} and {} states overlap: {}",
                    left,
                    right,
                    common.join(", ")
                ));
            }
        }

        Ok(())
    }

    /// Gap to sleep after a pending probe, given the previous gap
    pub fn next_interval(&self, previous: Option<Duration>) -> Duration {
        let interval = match (self.poll_interval, previous) {
            (Some(fixed), _) => fixed,
            (None, None) => INITIAL_POLL_INTERVAL,
            (None, Some(previous)) => previous.saturating_mul(2).min(MAX_POLL_INTERVAL),
        };
        interval.max(self.min_interval)
    }
}
