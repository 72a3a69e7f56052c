//! Provisioning stack contract
//!
//! The resource stack (bucket, origin access control, distribution) is owned by the
//! provider's declarative engine. This module only describes how its lifecycle is
//! observed and driven.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stack output holding the origin bucket name
pub const OUTPUT_BUCKET_NAME: &str = "BucketName";
/// Stack output holding the distribution id
pub const OUTPUT_DISTRIBUTION_ID: &str = "DistributionId";
/// Stack output holding the distribution host name
pub const OUTPUT_DISTRIBUTION_DOMAIN: &str = "DistributionDomainName";

/// Provisioning API
#[async_trait]
pub trait StackApi: Send + Sync {
    /// Describe a stack; `None` when it does not exist
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>>;

    /// Submit a create request, returning the stack id
    async fn create_stack(&self, request: &StackRequest) -> Result<String>;

    /// Submit an update request, returning the stack id
    ///
    /// "No updates are to be performed" surfaces as an API error; classifying it is
    /// the caller's job.
    async fn update_stack(&self, request: &StackRequest) -> Result<String>;

    /// Submit a delete request
    async fn delete_stack(&self, name: &str) -> Result<()>;

    /// Reasons reported by failed resource events of the latest operation
    async fn failure_reasons(&self, name: &str) -> Result<Vec<String>>;
}

/// Create/update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackRequest {
    pub name: String,

    /// Rendered template document
    pub template_body: String,

    pub parameters: HashMap<String, String>,

    pub tags: HashMap<String, String>,

    /// Delete the stack instead of leaving a half-built one when creation fails
    pub delete_on_failure: bool,
}

/// Snapshot of a stack as reported by the provisioning API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDescription {
    pub name: String,
    pub id: Option<String>,
    pub status: StackState,
    pub status_reason: Option<String>,
    pub outputs: HashMap<String, String>,
}

impl StackDescription {
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(|s| s.as_str())
    }
}

/// Provider-reported stack status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    RollbackInProgress,
    RollbackComplete,
    RollbackFailed,
    UpdateInProgress,
    UpdateCompleteCleanupInProgress,
    UpdateComplete,
    UpdateFailed,
    UpdateRollbackInProgress,
    UpdateRollbackComplete,
    UpdateRollbackFailed,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
    /// Status string this crate does not know
    Other(String),
}

impl StackState {
    /// Parse a provider status string such as `CREATE_COMPLETE`
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "CREATE_IN_PROGRESS" => StackState::CreateInProgress,
            "CREATE_COMPLETE" => StackState::CreateComplete,
            "CREATE_FAILED" => StackState::CreateFailed,
            "ROLLBACK_IN_PROGRESS" => StackState::RollbackInProgress,
            "ROLLBACK_COMPLETE" => StackState::RollbackComplete,
            "ROLLBACK_FAILED" => StackState::RollbackFailed,
            "UPDATE_IN_PROGRESS" => StackState::UpdateInProgress,
            "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS" => StackState::UpdateCompleteCleanupInProgress,
            "UPDATE_COMPLETE" => StackState::UpdateComplete,
            "UPDATE_FAILED" => StackState::UpdateFailed,
            "UPDATE_ROLLBACK_IN_PROGRESS" | "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS" => {
                StackState::UpdateRollbackInProgress
            }
            "UPDATE_ROLLBACK_COMPLETE" => StackState::UpdateRollbackComplete,
            "UPDATE_ROLLBACK_FAILED" => StackState::UpdateRollbackFailed,
            "DELETE_IN_PROGRESS" => StackState::DeleteInProgress,
            "DELETE_COMPLETE" => StackState::DeleteComplete,
            "DELETE_FAILED" => StackState::DeleteFailed,
            other => StackState::Other(other.to_string()),
        }
    }

    /// An operation is still running; the state will change without intervention
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            StackState::CreateInProgress
                | StackState::RollbackInProgress
                | StackState::UpdateInProgress
                | StackState::UpdateCompleteCleanupInProgress
                | StackState::UpdateRollbackInProgress
                | StackState::DeleteInProgress
        )
    }

    /// The stack exists but can no longer be updated and must be replaced
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            StackState::CreateFailed
                | StackState::RollbackComplete
                | StackState::RollbackFailed
                | StackState::DeleteFailed
        )
    }

    /// The stack is gone for all practical purposes
    pub fn is_deleted(&self) -> bool {
        matches!(self, StackState::DeleteComplete)
    }
}

impl std::fmt::Display for StackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StackState::CreateInProgress => "CREATE_IN_PROGRESS",
            StackState::CreateComplete => "CREATE_COMPLETE",
            StackState::CreateFailed => "CREATE_FAILED",
            StackState::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            StackState::RollbackComplete => "ROLLBACK_COMPLETE",
            StackState::RollbackFailed => "ROLLBACK_FAILED",
            StackState::UpdateInProgress => "UPDATE_IN_PROGRESS",
            StackState::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
            StackState::UpdateComplete => "UPDATE_COMPLETE",
            StackState::UpdateFailed => "UPDATE_FAILED",
            StackState::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
            StackState::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
            StackState::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
            StackState::DeleteInProgress => "DELETE_IN_PROGRESS",
            StackState::DeleteComplete => "DELETE_COMPLETE",
            StackState::DeleteFailed => "DELETE_FAILED",
            StackState::Other(s) => s,
        };
        f.write_str(s)
    }
}
