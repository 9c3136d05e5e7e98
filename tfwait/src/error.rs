//! Error types for tfwait

use std::time::Duration;

/// Error returned by a status probe when the read itself fails
pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for status waits
///
/// Every variant that can follow an observation carries the last observed
/// state and resource payload so callers can decide how to report it.
#[derive(Debug, thiserror::Error)]
pub enum WaitError<T> {
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{}', timeout: {timeout:?}){}",
        .target.join(", "),
        .last_state.as_deref().unwrap_or(""),
        last_error_suffix(.last_error)
    )]
    Timeout {
        timeout: Duration,
        elapsed: Duration,
        target: Vec<String>,
        last_state: Option<String>,
        last: Option<T>,
        last_error: Option<String>,
    },

    #[error(
        "unexpected state '{state}', wanted target '{}'{}",
        .target.join(", "),
        last_error_suffix(.last_error)
    )]
    UnexpectedState {
        state: String,
        target: Vec<String>,
        elapsed: Duration,
        last: Option<T>,
        last_error: Option<String>,
    },

    #[error("resource reached failure state '{state}'{}", last_error_suffix(.last_error))]
    FailureState {
        state: String,
        elapsed: Duration,
        last: Option<T>,
        last_error: Option<String>,
    },

    #[error("couldn't find resource ({checks} consecutive not-found probes)")]
    NotFound {
        checks: u32,
        elapsed: Duration,
        /// Last state seen before the resource went missing
        last_state: Option<String>,
        last: Option<T>,
    },

    #[error("status probe failed: {error}")]
    Probe {
        #[source]
        error: ProbeError,
        elapsed: Duration,
        last_state: Option<String>,
        last: Option<T>,
    },

    #[error(
        "wait cancelled after {elapsed:?} (last state: '{}')",
        .last_state.as_deref().unwrap_or("")
    )]
    Cancelled {
        elapsed: Duration,
        deadline_exceeded: bool,
        last_state: Option<String>,
        last: Option<T>,
    },

    #[error("invalid wait specification: {0}")]
    InvalidSpec(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(err) => format!(": {}", err),
        None => String::new(),
    }
}

impl<T> WaitError<T> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    pub fn is_unexpected_state(&self) -> bool {
        matches!(self, WaitError::UnexpectedState { .. })
    }

    pub fn is_failure_state(&self) -> bool {
        matches!(self, WaitError::FailureState { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WaitError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled { .. })
    }

    /// Time spent waiting, `None` when the wait never started
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            WaitError::Timeout { elapsed, .. }
            | WaitError::UnexpectedState { elapsed, .. }
            | WaitError::FailureState { elapsed, .. }
            | WaitError::NotFound { elapsed, .. }
            | WaitError::Probe { elapsed, .. }
            | WaitError::Cancelled { elapsed, .. } => Some(*elapsed),
            WaitError::InvalidSpec(_) => None,
        }
    }

    /// The last state observed before the wait stopped
    pub fn last_state(&self) -> Option<&str> {
        match self {
            WaitError::Timeout { last_state, .. }
            | WaitError::Probe { last_state, .. }
            | WaitError::NotFound { last_state, .. }
            | WaitError::Cancelled { last_state, .. } => last_state.as_deref(),
            WaitError::UnexpectedState { state, .. } | WaitError::FailureState { state, .. } => {
                Some(state)
            }
            WaitError::InvalidSpec(_) => None,
        }
    }

    /// The last resource payload observed before the wait stopped
    pub fn last_resource(&self) -> Option<&T> {
        match self {
            WaitError::Timeout { last, .. }
            | WaitError::UnexpectedState { last, .. }
            | WaitError::FailureState { last, .. }
            | WaitError::Probe { last, .. }
            | WaitError::NotFound { last, .. }
            | WaitError::Cancelled { last, .. } => last.as_ref(),
            WaitError::InvalidSpec(_) => None,
        }
    }

    pub fn into_last_resource(self) -> Option<T> {
        match self {
            WaitError::Timeout { last, .. }
            | WaitError::UnexpectedState { last, .. }
            | WaitError::FailureState { last, .. }
            | WaitError::Probe { last, .. }
            | WaitError::NotFound { last, .. }
            | WaitError::Cancelled { last, .. } => last,
            WaitError::InvalidSpec(_) => None,
        }
    }

    /// Attach a service-reported reason to a state-related error.
    /// Other variants are returned unchanged.
    pub fn with_last_error(mut self, reason: impl Into<String>) -> Self {
        match &mut self {
            WaitError::Timeout { last_error, .. }
            | WaitError::UnexpectedState { last_error, .. }
            | WaitError::FailureState { last_error, .. } => *last_error = Some(reason.into()),
            _ => {}
        }
        self
    }

    /// The service-reported reason attached with [`WaitError::with_last_error`]
    pub fn last_error(&self) -> Option<&str> {
        match self {
            WaitError::Timeout { last_error, .. }
            | WaitError::UnexpectedState { last_error, .. }
            | WaitError::FailureState { last_error, .. } => last_error.as_deref(),
            _ => None,
        }
    }
}

fn retry_last_suffix<E: std::fmt::Display>(last: &Option<E>) -> String {
    match last {
        Some(err) => format!(": {}", err),
        None => String::new(),
    }
}

/// Error type for [`crate::retry::retry_when`]
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::fmt::Display> {
    #[error("timeout after {elapsed:?} and {attempts} attempts{}", retry_last_suffix(.last))]
    Timeout {
        elapsed: Duration,
        attempts: u32,
        /// `None` when the only attempt was still running at the deadline
        last: Option<E>,
    },

    #[error("{0}")]
    Failed(E),

    #[error("retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32, last: Option<E> },
}

impl<E: std::fmt::Display> RetryError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetryError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// The last error returned by the operation, if it ran at all
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Failed(last) => Some(last),
            RetryError::Timeout { last, .. } | RetryError::Cancelled { last, .. } => last,
        }
    }
}
