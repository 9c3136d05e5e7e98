use aws_sdk_cloudcontrol::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Error codes AWS services use for a missing resource
const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFoundException",
    "RequestTokenNotFoundException",
    "DBClusterNotFoundFault",
    "DBInstanceNotFound",
    "NotFoundException",
];

/// Error codes AWS services use for throttled requests
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found ({code}): {message}")]
    NotFound { code: String, message: String },

    #[error("request throttled ({code}), retry later")]
    Throttled { code: String },

    #[error("API returned error {code}: {message}")]
    Service { code: String, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request could not be built: {0}")]
    InvalidRequest(String),

    #[error("failed to parse response: {0}")]
    ParseError(String),
}

impl ApiError {
    /// Classify a service error by its AWS error code
    pub fn from_code(code: &str, message: &str) -> Self {
        if NOT_FOUND_CODES.contains(&code) {
            ApiError::NotFound {
                code: code.to_string(),
                message: message.to_string(),
            }
        } else if THROTTLING_CODES.contains(&code) {
            ApiError::Throttled {
                code: code.to_string(),
            }
        } else {
            ApiError::Service {
                code: code.to_string(),
                message: message.to_string(),
            }
        }
    }

    /// Classify an SDK failure
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug,
    {
        match &err {
            SdkError::ServiceError(_) => {
                let code = err.code().unwrap_or("Unknown");
                let message = err.message().unwrap_or("");
                Self::from_code(code, message)
            }
            SdkError::ConstructionFailure(_) => {
                ApiError::InvalidRequest(DisplayErrorContext(&err).to_string())
            }
            _ => ApiError::Transport(DisplayErrorContext(&err).to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Throttling and transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Throttled { .. } | ApiError::Transport(_))
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { code, .. }
            | ApiError::Throttled { code }
            | ApiError::Service { code, .. } => Some(code),
            ApiError::Transport(_) | ApiError::InvalidRequest(_) | ApiError::ParseError(_) => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cloudcontrol::operation::get_resource::GetResourceError;

    #[test]
    fn classifies_not_found_codes() {
        let err = ApiError::from_code("ResourceNotFoundException", "Environment foo not found");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(err.code(), Some("ResourceNotFoundException"));

        assert!(ApiError::from_code("DBClusterNotFoundFault", "").is_not_found());
    }

    #[test]
    fn classifies_throttling_codes() {
        let err = ApiError::from_code("ThrottlingException", "Rate exceeded");
        assert!(matches!(err, ApiError::Throttled { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn other_codes_are_service_errors() {
        let err = ApiError::from_code("AccessDeniedException", "not authorized");
        assert!(!err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "API returned error AccessDeniedException: not authorized"
        );
    }

    #[test]
    fn construction_failures_are_not_retried() {
        let err: SdkError<GetResourceError> =
            SdkError::construction_failure("identifier is required");

        let err = ApiError::from_sdk(err);
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(!err.is_retryable());
        assert!(err.code().is_none());
    }

    #[test]
    fn sdk_timeouts_are_retryable() {
        let err: SdkError<GetResourceError> = SdkError::timeout_error("operation timed out");

        let err = ApiError::from_sdk(err);
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn transport_errors_are_retryable() {
        let err = ApiError::Transport("connection reset".to_string());
        assert!(err.is_retryable());
        assert!(err.code().is_none());
    }
}
