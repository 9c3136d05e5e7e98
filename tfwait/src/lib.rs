//! tfwait - status-polling waiters for Terraform providers
//!
//! Cloud resources are provisioned asynchronously: a Create call returns
//! while the resource is still `CREATING`. This crate provides the poll loop
//! that blocks until a resource reaches a target state, together with the
//! request context and retry helper used around it.

// Core modules
pub mod context;
pub mod error;

// Waiting
pub mod refresh;
pub mod state;
pub mod waiter;

// Helper modules
pub mod retry;

// Re-exports for convenience
pub use context::Context;
pub use error::{ProbeError, RetryError, WaitError};
pub use refresh::{Probe, WaitOutcome};
pub use retry::{retry_when, RetryConfig};
pub use state::{Classification, NotFoundPolicy, WaitSpec};
pub use waiter::wait_for_state;
