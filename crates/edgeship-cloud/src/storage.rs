//! Object storage contract

use crate::error::Result;
use async_trait::async_trait;

/// Object storage API
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Whether a bucket with this name exists and is reachable with current credentials
    async fn bucket_exists(&self, name: &str) -> Result<bool>;

    /// Delete every object (and object version) in the bucket
    async fn empty_bucket(&self, name: &str) -> Result<()>;

    /// Delete an empty bucket
    async fn delete_bucket(&self, name: &str) -> Result<()>;
}
