//! AWS backend error types

use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use edgeship_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("{operation} failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid request: {0}")]
    Build(#[from] aws_sdk_cloudformation::error::BuildError),

    #[error("Response is missing {0}")]
    MissingField(&'static str),

    #[error("No Route 53 hosted zone found for {0}")]
    ZoneNotFound(String),

    #[error("Unsupported record: {0}")]
    UnsupportedRecord(String),

    #[error("Could not read {path}: {message}")]
    Upload { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AwsError {
    /// Error code/message pair of a failed SDK call
    pub(crate) fn api<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let message = match (err.code(), err.message()) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message.to_string(),
            _ => DisplayErrorContext(&err).to_string(),
        };
        AwsError::Api { operation, message }
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            // 呼び出し側が "No updates are to be performed" などを判別できるよう本文を残す
            AwsError::Api { message, .. } => CloudError::ApiError(message),
            AwsError::ZoneNotFound(zone) => CloudError::ResourceNotFound(zone),
            AwsError::UnsupportedRecord(record) => CloudError::UnsupportedRecord(record),
            AwsError::Io(e) => CloudError::Io(e),
            AwsError::Json(e) => CloudError::Json(e),
            other => CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
