//! AWS client configuration
//!
//! Explicit settings win; anything left unset falls back to the standard
//! AWS environment variables. The loaded `SdkConfig` is handed to each API
//! client explicitly, nothing is cached process-wide.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use thiserror::Error;

use crate::validation::validate_region;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("region is required (set --region or the AWS_REGION / AWS_DEFAULT_REGION env var)")]
    MissingRegion,

    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("invalid endpoint URL '{0}': must start with http:// or https://")]
    InvalidEndpoint(String),
}

#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn resolved_region(&self) -> Result<String, ConfigError> {
        let region = self
            .region
            .clone()
            .or_else(|| env_var("AWS_REGION"))
            .or_else(|| env_var("AWS_DEFAULT_REGION"))
            .ok_or(ConfigError::MissingRegion)?;

        validate_region(&region).map_err(ConfigError::InvalidRegion)?;
        Ok(region)
    }

    pub fn resolved_profile(&self) -> Option<String> {
        self.profile.clone().or_else(|| env_var("AWS_PROFILE"))
    }

    pub fn resolved_endpoint_url(&self) -> Result<Option<String>, ConfigError> {
        match self.endpoint_url.clone().or_else(|| env_var("AWS_ENDPOINT_URL")) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Some(url.trim_end_matches('/').to_string()))
            }
            Some(url) => Err(ConfigError::InvalidEndpoint(url)),
            None => Ok(None),
        }
    }

    /// Build the shared SDK configuration used to construct API clients
    pub async fn load(&self) -> Result<SdkConfig, ConfigError> {
        let region = self.resolved_region()?;
        let endpoint_url = self.resolved_endpoint_url()?;

        tracing::debug!("Loading AWS configuration for region {}", region);

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(profile) = self.resolved_profile() {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint_url) = endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        Ok(loader.load().await)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
