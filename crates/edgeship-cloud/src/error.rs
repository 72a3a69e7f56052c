//! Cloud collaborator error types

use thiserror::Error;

/// Errors raised by cloud collaborators (stack, storage, CDN, certificate, DNS)
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Unsupported record: {0}")]
    UnsupportedRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Message carried by an API error, used for classifying provider responses
    pub fn api_message(&self) -> Option<&str> {
        match self {
            CloudError::ApiError(msg) => Some(msg),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
