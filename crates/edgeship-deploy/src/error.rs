//! Deployment engine error types

use edgeship_cloud::CloudError;
use thiserror::Error;

/// Unexpected failures; expected conditions are reported as outcomes instead
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Stack output missing: {0}")]
    MissingOutput(&'static str),
}

pub type Result<T> = std::result::Result<T, DeployError>;
