//! Site content publishing contract

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Summary of one upload run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub bytes: u64,
}

/// Uploads the built site into the origin bucket
#[async_trait]
pub trait SitePublisher: Send + Sync {
    async fn sync(&self, source: &Path, bucket: &str) -> Result<SyncReport>;
}
