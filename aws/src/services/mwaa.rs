//! Waiters for Amazon MWAA (Managed Workflows for Apache Airflow) environments
//!
//! Only waiter configuration lives here. No SDK client implements
//! [`MwaaApi`] in this crate; callers plug in their own client around
//! `GetEnvironment`, the same way [`crate::api::CloudControlClient`] wraps Cloud
//! Control.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tfwait::{Context, Probe, ProbeError, WaitError, WaitSpec};

use crate::api::ApiError;

pub const ENVIRONMENT_STATUS_CREATING: &str = "CREATING";
pub const ENVIRONMENT_STATUS_CREATE_FAILED: &str = "CREATE_FAILED";
pub const ENVIRONMENT_STATUS_AVAILABLE: &str = "AVAILABLE";
pub const ENVIRONMENT_STATUS_UPDATING: &str = "UPDATING";
pub const ENVIRONMENT_STATUS_UPDATE_FAILED: &str = "UPDATE_FAILED";
pub const ENVIRONMENT_STATUS_DELETING: &str = "DELETING";
pub const ENVIRONMENT_STATUS_DELETED: &str = "DELETED";

/// Maximum amount of time to wait for an environment creation
pub const ENVIRONMENT_CREATED_TIMEOUT: Duration = Duration::from_secs(90 * 60);
/// Maximum amount of time to wait for an environment update
pub const ENVIRONMENT_UPDATED_TIMEOUT: Duration = Duration::from_secs(90 * 60);
/// Maximum amount of time to wait for an environment deletion
pub const ENVIRONMENT_DELETED_TIMEOUT: Duration = Duration::from_secs(90 * 60);
/// Environments take minutes to change state, no point probing right away
pub const ENVIRONMENT_STATUS_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub name: String,
    pub arn: Option<String>,
    pub status: String,
    /// `code: message` of the last failed update, if any
    pub last_update_error: Option<String>,
}

#[async_trait]
pub trait MwaaApi: Send + Sync {
    async fn get_environment(&self, name: &str) -> Result<Environment, ApiError>;
}

pub async fn status_environment<A: MwaaApi + ?Sized>(
    api: &A,
    name: &str,
) -> Result<Probe<Environment>, ProbeError> {
    match api.get_environment(name).await {
        Ok(environment) => {
            let status = environment.status.clone();
            Ok(Probe::found(environment, status))
        }
        Err(err) if err.is_not_found() => Ok(Probe::NotFound),
        Err(err) => Err(err.into()),
    }
}

fn with_update_error(err: WaitError<Environment>) -> WaitError<Environment> {
    let reason = err
        .last_resource()
        .and_then(|environment| environment.last_update_error.clone());
    match reason {
        Some(reason) => err.with_last_error(reason),
        None => err,
    }
}

/// Waits for an environment to become AVAILABLE after creation
pub async fn wait_environment_created<A: MwaaApi + ?Sized>(
    ctx: &Context,
    api: &A,
    name: &str,
) -> Result<Environment, WaitError<Environment>> {
    let spec = WaitSpec::new(ENVIRONMENT_CREATED_TIMEOUT)
        .with_pending([ENVIRONMENT_STATUS_CREATING])
        .with_target([ENVIRONMENT_STATUS_AVAILABLE])
        .with_failure([ENVIRONMENT_STATUS_CREATE_FAILED])
        .with_delay(ENVIRONMENT_STATUS_DELAY);

    spec.wait(ctx, || status_environment(api, name))
        .await
        .and_then(|outcome| outcome.into_found())
        .map_err(with_update_error)
}

/// Waits for an environment to become AVAILABLE after an update
pub async fn wait_environment_updated<A: MwaaApi + ?Sized>(
    ctx: &Context,
    api: &A,
    name: &str,
) -> Result<Environment, WaitError<Environment>> {
    let spec = WaitSpec::new(ENVIRONMENT_UPDATED_TIMEOUT)
        .with_pending([ENVIRONMENT_STATUS_UPDATING])
        .with_target([ENVIRONMENT_STATUS_AVAILABLE])
        .with_failure([ENVIRONMENT_STATUS_UPDATE_FAILED])
        .with_delay(ENVIRONMENT_STATUS_DELAY);

    spec.wait(ctx, || status_environment(api, name))
        .await
        .and_then(|outcome| outcome.into_found())
        .map_err(with_update_error)
}

/// Waits for an environment to disappear
pub async fn wait_environment_deleted<A: MwaaApi + ?Sized>(
    ctx: &Context,
    api: &A,
    name: &str,
) -> Result<(), WaitError<Environment>> {
    let spec = WaitSpec::new(ENVIRONMENT_DELETED_TIMEOUT)
        .with_pending([ENVIRONMENT_STATUS_DELETING])
        .with_target([ENVIRONMENT_STATUS_DELETED])
        .with_delay(ENVIRONMENT_STATUS_DELAY)
        .target_not_found();

    spec.wait(ctx, || status_environment(api, name)).await?;
    Ok(())
}
