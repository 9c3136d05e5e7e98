//! AWS Cloud Control API client
//!
//! Cloud Control tracks every create/update/delete as a resource request
//! identified by a request token. The waiters in
//! [`crate::services::cloudcontrol`] poll those requests through the
//! [`CloudControlApi`] trait so tests can substitute a scripted fake.

use async_trait::async_trait;
use aws_config::SdkConfig;
use serde::Serialize;

use super::error::ApiError;

/// Status of a Cloud Control resource request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub request_token: String,
    pub type_name: Option<String>,
    pub identifier: Option<String>,
    pub operation: Option<String>,
    pub operation_status: String,
    pub status_message: Option<String>,
    pub error_code: Option<String>,
}

impl ProgressEvent {
    /// Handler-reported reason, e.g. `NotStabilized: Resource stabilization failed`
    pub fn failure_reason(&self) -> Option<String> {
        match (&self.error_code, &self.status_message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (Some(code), None) => Some(code.clone()),
            (None, Some(message)) if !message.is_empty() => Some(message.clone()),
            _ => None,
        }
    }
}

/// Current properties of a resource managed through Cloud Control
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDescription {
    pub type_name: String,
    pub identifier: String,
    pub properties: serde_json::Value,
}

#[async_trait]
pub trait CloudControlApi: Send + Sync {
    async fn get_resource_request_status(
        &self,
        request_token: &str,
    ) -> Result<ProgressEvent, ApiError>;

    async fn get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> Result<ResourceDescription, ApiError>;
}

/// Cloud Control client backed by the AWS SDK
#[derive(Clone)]
pub struct CloudControlClient {
    inner: aws_sdk_cloudcontrol::Client,
}

impl CloudControlClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            inner: aws_sdk_cloudcontrol::Client::new(config),
        }
    }

    pub fn from_client(client: aws_sdk_cloudcontrol::Client) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl CloudControlApi for CloudControlClient {
    async fn get_resource_request_status(
        &self,
        request_token: &str,
    ) -> Result<ProgressEvent, ApiError> {
        tracing::debug!("GetResourceRequestStatus for request {}", request_token);

        let output = self
            .inner
            .get_resource_request_status()
            .request_token(request_token)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        let event = output.progress_event().ok_or_else(|| {
            ApiError::ParseError(format!(
                "no progress event returned for request {}",
                request_token
            ))
        })?;

        let operation_status = event
            .operation_status()
            .map(|status| status.as_str().to_string())
            .ok_or_else(|| {
                ApiError::ParseError(format!(
                    "no operation status returned for request {}",
                    request_token
                ))
            })?;

        Ok(ProgressEvent {
            request_token: event
                .request_token()
                .unwrap_or(request_token)
                .to_string(),
            type_name: event.type_name().map(str::to_string),
            identifier: event.identifier().map(str::to_string),
            operation: event.operation().map(|op| op.as_str().to_string()),
            operation_status,
            status_message: event.status_message().map(str::to_string),
            error_code: event.error_code().map(|code| code.as_str().to_string()),
        })
    }

    async fn get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> Result<ResourceDescription, ApiError> {
        tracing::debug!("GetResource for {} {}", type_name, identifier);

        let output = self
            .inner
            .get_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        let description = output.resource_description().ok_or_else(|| {
            ApiError::ParseError(format!(
                "no resource description returned for {} {}",
                type_name, identifier
            ))
        })?;

        let properties = match description.properties() {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                tracing::error!("Failed to deserialize properties: {}, body: {}", e, raw);
                ApiError::ParseError(format!("invalid resource properties: {}", e))
            })?,
            None => serde_json::Value::Null,
        };

        Ok(ResourceDescription {
            type_name: output.type_name().unwrap_or(type_name).to_string(),
            identifier: description.identifier().unwrap_or(identifier).to_string(),
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(error_code: Option<&str>, status_message: Option<&str>) -> ProgressEvent {
        ProgressEvent {
            request_token: "token".to_string(),
            type_name: Some("AWS::Logs::LogGroup".to_string()),
            identifier: None,
            operation: Some("CREATE".to_string()),
            operation_status: "FAILED".to_string(),
            status_message: status_message.map(str::to_string),
            error_code: error_code.map(str::to_string),
        }
    }

    #[test]
    fn failure_reason_combines_code_and_message() {
        let reason = event(Some("AlreadyExists"), Some("log group exists")).failure_reason();
        assert_eq!(reason.as_deref(), Some("AlreadyExists: log group exists"));
    }

    #[test]
    fn failure_reason_falls_back_to_either_part() {
        assert_eq!(
            event(Some("InternalFailure"), None).failure_reason().as_deref(),
            Some("InternalFailure")
        );
        assert_eq!(
            event(None, Some("stabilization failed")).failure_reason().as_deref(),
            Some("stabilization failed")
        );
        assert!(event(None, Some("")).failure_reason().is_none());
        assert!(event(None, None).failure_reason().is_none());
    }

    #[test]
    fn progress_event_serializes_as_json() {
        let json = serde_json::to_value(event(None, None)).unwrap();
        assert_eq!(json["operation_status"], "FAILED");
        assert_eq!(json["type_name"], "AWS::Logs::LogGroup");
    }
}
