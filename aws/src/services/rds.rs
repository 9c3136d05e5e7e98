//! Waiters for RDS database activity streams
//!
//! Only waiter configuration lives here. No SDK client implements
//! [`RdsApi`] in this crate; callers plug in their own client around
//! `DescribeDBClusters`/`DescribeDBInstances`, the same way
//! [`crate::api::CloudControlClient`] wraps Cloud Control.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tfwait::{Context, Probe, ProbeError, WaitError, WaitSpec};

use crate::api::ApiError;

pub const ACTIVITY_STREAM_STATUS_STARTING: &str = "starting";
pub const ACTIVITY_STREAM_STATUS_STARTED: &str = "started";
pub const ACTIVITY_STREAM_STATUS_STOPPING: &str = "stopping";
pub const ACTIVITY_STREAM_STATUS_STOPPED: &str = "stopped";

pub const ACTIVITY_STREAM_STARTED_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const ACTIVITY_STREAM_STOPPED_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const ACTIVITY_STREAM_DELAY: Duration = Duration::from_secs(30);
const ACTIVITY_STREAM_MIN_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStream {
    /// ARN of the DB cluster or DB instance the stream belongs to
    pub resource_arn: String,
    pub status: String,
    pub mode: Option<String>,
    pub kinesis_stream_name: Option<String>,
    pub kms_key_id: Option<String>,
}

#[async_trait]
pub trait RdsApi: Send + Sync {
    /// Activity stream of a DB cluster or DB instance, by ARN
    async fn describe_activity_stream(&self, resource_arn: &str)
        -> Result<ActivityStream, ApiError>;
}

pub async fn status_activity_stream<A: RdsApi + ?Sized>(
    api: &A,
    resource_arn: &str,
) -> Result<Probe<ActivityStream>, ProbeError> {
    match api.describe_activity_stream(resource_arn).await {
        Ok(stream) => {
            let status = stream.status.clone();
            Ok(Probe::found(stream, status))
        }
        Err(err) if err.is_not_found() => Ok(Probe::NotFound),
        Err(err) => Err(err.into()),
    }
}

fn activity_stream_spec(timeout: Duration) -> WaitSpec {
    WaitSpec::new(timeout)
        .with_delay(ACTIVITY_STREAM_DELAY)
        .with_min_interval(ACTIVITY_STREAM_MIN_INTERVAL)
}

pub async fn wait_activity_stream_started<A: RdsApi + ?Sized>(
    ctx: &Context,
    api: &A,
    resource_arn: &str,
) -> Result<ActivityStream, WaitError<ActivityStream>> {
    let spec = activity_stream_spec(ACTIVITY_STREAM_STARTED_TIMEOUT)
        .with_pending([ACTIVITY_STREAM_STATUS_STARTING])
        .with_target([ACTIVITY_STREAM_STATUS_STARTED]);

    spec.wait(ctx, || status_activity_stream(api, resource_arn))
        .await
        .and_then(|outcome| outcome.into_found())
}

/// A stopped stream may be reported as gone rather than `stopped`
pub async fn wait_activity_stream_stopped<A: RdsApi + ?Sized>(
    ctx: &Context,
    api: &A,
    resource_arn: &str,
) -> Result<(), WaitError<ActivityStream>> {
    let spec = activity_stream_spec(ACTIVITY_STREAM_STOPPED_TIMEOUT)
        .with_pending([ACTIVITY_STREAM_STATUS_STOPPING])
        .with_target([ACTIVITY_STREAM_STATUS_STOPPED])
        .target_not_found();

    spec.wait(ctx, || status_activity_stream(api, resource_arn))
        .await?;
    Ok(())
}
