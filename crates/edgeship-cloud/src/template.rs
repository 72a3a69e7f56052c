//! Stack template contract
//!
//! The field mapping of individual resources lives in the backend; the engine only
//! hands over the values that vary per site.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Per-site values rendered into the provisioning template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInput {
    pub site: String,
    pub bucket_name: String,

    /// Alternate domain names of the distribution
    pub aliases: Vec<String>,

    /// Issued certificate attached to the distribution
    pub certificate_id: String,

    pub index_document: String,
    pub error_document: Option<String>,

    pub min_ttl: u64,
    pub default_ttl: u64,
    pub max_ttl: u64,

    pub price_class: String,
}

/// Renders the provisioning template document
pub trait StackTemplate: Send + Sync {
    /// Template body submitted with create/update requests
    fn render(&self, input: &TemplateInput) -> Result<String>;
}
