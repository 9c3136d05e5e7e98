//! Status waiters for AWS resources
//!
//! The generic polling engine lives in [`tfwait`]; this crate supplies the
//! AWS side of it: API clients, error classification, configuration and a
//! status function plus wait functions per resource.

pub mod api;
pub mod config;
pub mod services;
pub mod validation;

pub use api::{ApiError, CloudControlApi, CloudControlClient, ProgressEvent, ResourceDescription};
pub use config::{AwsConfig, ConfigError};
