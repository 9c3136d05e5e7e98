//! Per-resource waiters
//!
//! Each module pairs a status function, which turns one API read into a
//! [`tfwait::Probe`], with the wait functions the resource's
//! Create/Update/Delete paths call. The API client is always passed in.

pub mod cloudcontrol;
pub mod firehose;
pub mod mwaa;
pub mod rds;
