//! Waiters for Cloud Control resource requests

use std::time::Duration;
use tfwait::{
    retry_when, Context, NotFoundPolicy, Probe, ProbeError, RetryConfig, RetryError, WaitError,
    WaitSpec,
};

use crate::api::{ApiError, CloudControlApi, ProgressEvent, ResourceDescription};

pub const OPERATION_STATUS_PENDING: &str = "PENDING";
pub const OPERATION_STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const OPERATION_STATUS_SUCCESS: &str = "SUCCESS";
pub const OPERATION_STATUS_FAILED: &str = "FAILED";
pub const OPERATION_STATUS_CANCEL_IN_PROGRESS: &str = "CANCEL_IN_PROGRESS";
pub const OPERATION_STATUS_CANCEL_COMPLETE: &str = "CANCEL_COMPLETE";

/// Default budget for a resource request to finish
pub const RESOURCE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Smallest gap between two request status probes
pub const RESOURCE_REQUEST_MIN_INTERVAL: Duration = Duration::from_secs(5);

/// How long a freshly created resource may stay invisible to reads
pub const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(2 * 60);

pub async fn status_resource_request<A: CloudControlApi + ?Sized>(
    api: &A,
    request_token: &str,
) -> Result<Probe<ProgressEvent>, ProbeError> {
    match api.get_resource_request_status(request_token).await {
        Ok(event) => {
            let status = event.operation_status.clone();
            Ok(Probe::found(event, status))
        }
        Err(err) if err.is_not_found() => Ok(Probe::NotFound),
        Err(err) => Err(err.into()),
    }
}

/// Wait for a resource request to finish successfully
pub async fn wait_resource_request_succeeded<A: CloudControlApi + ?Sized>(
    ctx: &Context,
    api: &A,
    request_token: &str,
    timeout: Duration,
) -> Result<ProgressEvent, WaitError<ProgressEvent>> {
    let spec = WaitSpec::new(timeout)
        .with_pending([
            OPERATION_STATUS_PENDING,
            OPERATION_STATUS_IN_PROGRESS,
            OPERATION_STATUS_CANCEL_IN_PROGRESS,
        ])
        .with_target([OPERATION_STATUS_SUCCESS])
        .with_failure([OPERATION_STATUS_FAILED, OPERATION_STATUS_CANCEL_COMPLETE])
        .with_min_interval(RESOURCE_REQUEST_MIN_INTERVAL)
        .with_not_found(NotFoundPolicy::Fail);

    tracing::debug!("Waiting for resource request {} to succeed", request_token);

    spec.wait(ctx, || status_resource_request(api, request_token))
        .await
        .and_then(|outcome| outcome.into_found())
        .map_err(with_handler_reason)
}

fn with_handler_reason(err: WaitError<ProgressEvent>) -> WaitError<ProgressEvent> {
    let reason = err.last_resource().and_then(ProgressEvent::failure_reason);
    match reason {
        Some(reason) => err.with_last_error(reason),
        None => err,
    }
}

/// Read a resource, `None` when it does not exist
pub async fn find_resource<A: CloudControlApi + ?Sized>(
    api: &A,
    type_name: &str,
    identifier: &str,
) -> Result<Option<ResourceDescription>, ApiError> {
    match api.get_resource(type_name, identifier).await {
        Ok(resource) => Ok(Some(resource)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Read a resource that was just created, retrying while it is not yet
/// visible or the API throttles
pub async fn find_resource_after_create<A: CloudControlApi + ?Sized>(
    ctx: &Context,
    api: &A,
    type_name: &str,
    identifier: &str,
    timeout: Duration,
) -> Result<ResourceDescription, RetryError<ApiError>> {
    retry_when(
        ctx,
        timeout,
        &RetryConfig::default(),
        || api.get_resource(type_name, identifier),
        |err: &ApiError| err.is_not_found() || err.is_retryable(),
    )
    .await
}
