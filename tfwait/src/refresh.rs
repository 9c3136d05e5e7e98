//! Status probe results
//!
//! A status prober is any `FnMut() -> impl Future<Output = Result<Probe<T>, ProbeError>>`.
//! It issues one read against the cloud API and reports whether the resource
//! exists and, if so, its current state. Probers must not change anything
//! remotely; the waiter may call them many times.

use crate::error::WaitError;

/// Outcome of a single status probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// The resource exists and is in `status`
    Found { resource: T, status: String },
    /// The resource does not exist
    NotFound,
}

impl<T> Probe<T> {
    pub fn found(resource: T, status: impl Into<String>) -> Self {
        Probe::Found {
            resource,
            status: status.into(),
        }
    }

    pub fn status(&self) -> Option<&str> {
        match self {
            Probe::Found { status, .. } => Some(status),
            Probe::NotFound => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Probe<U> {
        match self {
            Probe::Found { resource, status } => Probe::Found {
                resource: f(resource),
                status,
            },
            Probe::NotFound => Probe::NotFound,
        }
    }
}

/// Final state reached by a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome<T> {
    /// Last observed resource; `None` when the resource is gone
    pub resource: Option<T>,
    /// Last observed state; `None` when the resource is gone
    pub state: Option<String>,
    pub probes: u32,
    /// Consecutive not-found probes that ended the wait, 0 when a target
    /// state was observed
    pub not_found_checks: u32,
    pub elapsed: std::time::Duration,
}

impl<T> WaitOutcome<T> {
    pub fn is_gone(&self) -> bool {
        self.resource.is_none()
    }

    pub fn into_resource(self) -> Option<T> {
        self.resource
    }

    /// The resource of a wait that had to observe a real target state.
    /// A wait that ended because the resource is gone becomes `NotFound`.
    pub fn into_found(self) -> Result<T, WaitError<T>> {
        match self.resource {
            Some(resource) => Ok(resource),
            None => Err(WaitError::NotFound {
                checks: self.not_found_checks,
                elapsed: self.elapsed,
                last_state: None,
                last: None,
            }),
        }
    }
}
