//! CDN distribution contract

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// CDN API
#[async_trait]
pub trait CdnApi: Send + Sync {
    /// List all distributions of the account
    async fn list_distributions(&self) -> Result<Vec<DistributionSummary>>;

    /// Fetch the origin configuration of a distribution
    async fn get_distribution_config(&self, id: &str) -> Result<DistributionConfig>;

    /// Invalidate cached paths, returning the invalidation id
    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String>;
}

/// Distribution as listed by the CDN API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub id: String,

    /// Host name assigned by the CDN (e.g., `d111111abcdef8.cloudfront.net`)
    pub domain_name: String,

    #[serde(default)]
    pub aliases: Aliases,
}

/// Configured alternate domain names
///
/// Depending on how the listing was decoded, a distribution with a single alias can
/// come back as a bare string instead of a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Aliases {
    Many(Vec<String>),
    One(String),
    Items { items: Option<Box<Aliases>> },
}

impl Default for Aliases {
    fn default() -> Self {
        Aliases::Many(Vec::new())
    }
}

impl Aliases {
    /// Normalize every shape into a flat list
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Aliases::Many(list) => list.clone(),
            Aliases::One(alias) => vec![alias.clone()],
            Aliases::Items { items: Some(inner) } => inner.to_vec(),
            Aliases::Items { items: None } => Vec::new(),
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.to_vec()
            .iter()
            .any(|alias| crate::dns::names_equal(alias, domain))
    }
}

impl From<Vec<String>> for Aliases {
    fn from(list: Vec<String>) -> Self {
        Aliases::Many(list)
    }
}

/// Origin configuration of a distribution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub origins: Vec<Origin>,
}

/// A single distribution origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Origin {
    pub id: String,

    /// Origin host (e.g., `my-bucket.s3.us-east-1.amazonaws.com`)
    pub domain_name: String,
}
