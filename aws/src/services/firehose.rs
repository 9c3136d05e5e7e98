//! Waiters for Kinesis Data Firehose delivery streams
//!
//! Only waiter configuration lives here. No SDK client implements
//! [`FirehoseApi`] in this crate; callers plug in their own client around
//! `DescribeDeliveryStream`, the same way [`crate::api::CloudControlClient`] wraps Cloud
//! Control.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tfwait::{Context, Probe, ProbeError, WaitError, WaitSpec};

use crate::api::ApiError;

pub const DELIVERY_STREAM_STATUS_CREATING: &str = "CREATING";
pub const DELIVERY_STREAM_STATUS_CREATING_FAILED: &str = "CREATING_FAILED";
pub const DELIVERY_STREAM_STATUS_ACTIVE: &str = "ACTIVE";
pub const DELIVERY_STREAM_STATUS_DELETING: &str = "DELETING";
pub const DELIVERY_STREAM_STATUS_DELETING_FAILED: &str = "DELETING_FAILED";

pub const ENCRYPTION_STATUS_ENABLING: &str = "ENABLING";
pub const ENCRYPTION_STATUS_ENABLING_FAILED: &str = "ENABLING_FAILED";
pub const ENCRYPTION_STATUS_ENABLED: &str = "ENABLED";
pub const ENCRYPTION_STATUS_DISABLING: &str = "DISABLING";
pub const ENCRYPTION_STATUS_DISABLING_FAILED: &str = "DISABLING_FAILED";
pub const ENCRYPTION_STATUS_DISABLED: &str = "DISABLED";

pub const DELIVERY_STREAM_ENCRYPTION_ENABLED_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const DELIVERY_STREAM_ENCRYPTION_DISABLED_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDescription {
    pub failure_type: String,
    pub details: String,
}

impl fmt::Display for FailureDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.failure_type, self.details)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncryptionConfiguration {
    pub status: String,
    pub key_type: Option<String>,
    pub failure_description: Option<FailureDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryStreamDescription {
    pub name: String,
    pub arn: Option<String>,
    pub status: String,
    pub failure_description: Option<FailureDescription>,
    pub encryption: Option<EncryptionConfiguration>,
}

#[async_trait]
pub trait FirehoseApi: Send + Sync {
    async fn describe_delivery_stream(
        &self,
        name: &str,
    ) -> Result<DeliveryStreamDescription, ApiError>;
}

pub async fn status_delivery_stream<A: FirehoseApi + ?Sized>(
    api: &A,
    name: &str,
) -> Result<Probe<DeliveryStreamDescription>, ProbeError> {
    match api.describe_delivery_stream(name).await {
        Ok(stream) => {
            let status = stream.status.clone();
            Ok(Probe::found(stream, status))
        }
        Err(err) if err.is_not_found() => Ok(Probe::NotFound),
        Err(err) => Err(err.into()),
    }
}

/// A stream without an encryption configuration is reported as not found
pub async fn status_delivery_stream_encryption<A: FirehoseApi + ?Sized>(
    api: &A,
    name: &str,
) -> Result<Probe<EncryptionConfiguration>, ProbeError> {
    match api.describe_delivery_stream(name).await {
        Ok(DeliveryStreamDescription {
            encryption: Some(encryption),
            ..
        }) => {
            let status = encryption.status.clone();
            Ok(Probe::found(encryption, status))
        }
        Ok(_) => Ok(Probe::NotFound),
        Err(err) if err.is_not_found() => Ok(Probe::NotFound),
        Err(err) => Err(err.into()),
    }
}

fn with_stream_failure(
    err: WaitError<DeliveryStreamDescription>,
    failed_status: &str,
) -> WaitError<DeliveryStreamDescription> {
    let reason = err
        .last_resource()
        .filter(|stream| stream.status == failed_status)
        .and_then(|stream| stream.failure_description.as_ref())
        .map(FailureDescription::to_string);
    match reason {
        Some(reason) => err.with_last_error(reason),
        None => err,
    }
}

fn with_encryption_failure(
    err: WaitError<EncryptionConfiguration>,
    failed_status: &str,
) -> WaitError<EncryptionConfiguration> {
    let reason = err
        .last_resource()
        .filter(|encryption| encryption.status == failed_status)
        .and_then(|encryption| encryption.failure_description.as_ref())
        .map(FailureDescription::to_string);
    match reason {
        Some(reason) => err.with_last_error(reason),
        None => err,
    }
}

pub async fn wait_delivery_stream_created<A: FirehoseApi + ?Sized>(
    ctx: &Context,
    api: &A,
    name: &str,
    timeout: Duration,
) -> Result<DeliveryStreamDescription, WaitError<DeliveryStreamDescription>> {
    let spec = WaitSpec::new(timeout)
        .with_pending([DELIVERY_STREAM_STATUS_CREATING])
        .with_target([DELIVERY_STREAM_STATUS_ACTIVE])
        .with_failure([DELIVERY_STREAM_STATUS_CREATING_FAILED]);

    spec.wait(ctx, || status_delivery_stream(api, name))
        .await
        .and_then(|outcome| outcome.into_found())
        .map_err(|err| with_stream_failure(err, DELIVERY_STREAM_STATUS_CREATING_FAILED))
}

pub async fn wait_delivery_stream_deleted<A: FirehoseApi + ?Sized>(
    ctx: &Context,
    api: &A,
    name: &str,
    timeout: Duration,
) -> Result<(), WaitError<DeliveryStreamDescription>> {
    let spec = WaitSpec::new(timeout)
        .with_pending([DELIVERY_STREAM_STATUS_DELETING])
        .with_failure([DELIVERY_STREAM_STATUS_DELETING_FAILED])
        .target_not_found();

    spec.wait(ctx, || status_delivery_stream(api, name))
        .await
        .map_err(|err| with_stream_failure(err, DELIVERY_STREAM_STATUS_DELETING_FAILED))?;
    Ok(())
}

pub async fn wait_delivery_stream_encryption_enabled<A: FirehoseApi + ?Sized>(
    ctx: &Context,
    api: &A,
    name: &str,
) -> Result<EncryptionConfiguration, WaitError<EncryptionConfiguration>> {
    let spec = WaitSpec::new(DELIVERY_STREAM_ENCRYPTION_ENABLED_TIMEOUT)
        .with_pending([ENCRYPTION_STATUS_ENABLING])
        .with_target([ENCRYPTION_STATUS_ENABLED])
        .with_failure([ENCRYPTION_STATUS_ENABLING_FAILED]);

    spec.wait(ctx, || status_delivery_stream_encryption(api, name))
        .await
        .and_then(|outcome| outcome.into_found())
        .map_err(|err| with_encryption_failure(err, ENCRYPTION_STATUS_ENABLING_FAILED))
}

pub async fn wait_delivery_stream_encryption_disabled<A: FirehoseApi + ?Sized>(
    ctx: &Context,
    api: &A,
    name: &str,
) -> Result<EncryptionConfiguration, WaitError<EncryptionConfiguration>> {
    let spec = WaitSpec::new(DELIVERY_STREAM_ENCRYPTION_DISABLED_TIMEOUT)
        .with_pending([ENCRYPTION_STATUS_DISABLING])
        .with_target([ENCRYPTION_STATUS_DISABLED])
        .with_failure([ENCRYPTION_STATUS_DISABLING_FAILED]);

    spec.wait(ctx, || status_delivery_stream_encryption(api, name))
        .await
        .and_then(|outcome| outcome.into_found())
        .map_err(|err| with_encryption_failure(err, ENCRYPTION_STATUS_DISABLING_FAILED))
}
