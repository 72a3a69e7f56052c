//! Cloudflare provider error types

use edgeship_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudflareError {
    #[error("Environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("No Cloudflare zone found for {0}")]
    ZoneNotFound(String),

    #[error("Cloudflare API error: {0}")]
    ApiError(String),

    #[error("Unsupported record: {0}")]
    UnsupportedRecord(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<CloudflareError> for CloudError {
    fn from(err: CloudflareError) -> Self {
        match err {
            CloudflareError::MissingEnvVar(var) => {
                CloudError::AuthenticationFailed(format!("{} is not set", var))
            }
            CloudflareError::ZoneNotFound(domain) => CloudError::ResourceNotFound(domain),
            CloudflareError::UnsupportedRecord(record) => CloudError::UnsupportedRecord(record),
            CloudflareError::JsonError(e) => CloudError::Json(e),
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudflareError>;
