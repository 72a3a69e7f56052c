//! DNS provider capability interface
//!
//! Every DNS backend (Route 53, Cloudflare, ...) implements [`DnsProvider`] so the
//! reconciliation engine can treat native and third-party DNS uniformly.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// DNS provider abstraction trait
///
/// All writes are idempotent upserts keyed by `(name, type)`: applying an
/// already-correct record must succeed and report [`RecordChange::Unchanged`].
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Returns the provider name (e.g., "route53", "cloudflare")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Record shapes this provider accepts at a zone apex
    fn capabilities(&self) -> ProviderCapabilities;

    /// Whether this provider hosts (and may modify) the zone for `domain`
    async fn can_manage_domain(&self, domain: &str) -> Result<bool>;

    /// List the records of the zone serving `domain`
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>>;

    /// Create the record, or update it in place when `(name, type)` already exists
    async fn upsert_record(&self, domain: &str, record: &DnsRecord) -> Result<RecordChange>;

    /// Delete the record matching `(name, type)`
    async fn delete_record(&self, domain: &str, record: &DnsRecord) -> Result<()>;
}

/// Apex record support of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Supports alias-style pseudo records at the apex (e.g., Route 53 alias A)
    pub alias_records: bool,

    /// Tolerates a CNAME at the apex (e.g., Cloudflare CNAME flattening)
    pub apex_cname: bool,
}

/// Result of an upsert as seen by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordChange {
    Created,
    Updated,
    Unchanged,
}

impl std::fmt::Display for RecordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordChange::Created => write!(f, "created"),
            RecordChange::Updated => write!(f, "updated"),
            RecordChange::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    /// Provider-specific pseudo-CNAME usable at an apex
    Alias,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Alias => "ALIAS",
        }
    }

    /// CNAME and alias records point at a host name
    pub fn targets_host(&self) -> bool {
        matches!(self, RecordType::Cname | RecordType::Alias)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = crate::CloudError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "TXT" => Ok(RecordType::Txt),
            "ALIAS" => Ok(RecordType::Alias),
            other => Err(crate::CloudError::UnsupportedRecord(other.to_string())),
        }
    }
}

/// A DNS record, either desired or observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully qualified name without the trailing dot
    pub name: String,

    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Target host name, address or text value
    pub content: String,

    /// TTL in seconds; `None` lets the provider choose
    pub ttl: Option<u32>,
}

impl DnsRecord {
    pub fn new(name: impl Into<String>, record_type: RecordType, content: impl Into<String>) -> Self {
        let content = content.into();
        let content = if record_type.targets_host() {
            normalize_name(&content)
        } else {
            content
        };
        Self {
            name: normalize_name(&name.into()),
            record_type,
            content,
            ttl: None,
        }
    }

    pub fn cname(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RecordType::Cname, target)
    }

    pub fn alias(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RecordType::Alias, target)
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Whether both records address the same `(name, type)` slot
    pub fn same_key(&self, other: &DnsRecord) -> bool {
        self.record_type == other.record_type && names_equal(&self.name, &other.name)
    }

    /// Whether `other` already carries this record's target
    pub fn same_content(&self, other: &DnsRecord) -> bool {
        if self.record_type.targets_host() {
            names_equal(&self.content, &other.content)
        } else {
            self.content.trim_matches('"') == other.content.trim_matches('"')
        }
    }
}

impl std::fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} -> {}", self.name, self.record_type, self.content)
    }
}

/// Lowercase and strip the trailing root dot
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Case- and trailing-dot-insensitive name comparison
pub fn names_equal(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

/// A domain with exactly two labels (e.g., `example.com`)
pub fn is_apex_domain(domain: &str) -> bool {
    let domain = normalize_name(domain);
    !domain.is_empty() && domain.split('.').count() == 2
}

/// First label of a domain (`app` for `app.example.com`)
pub fn first_label(domain: &str) -> String {
    normalize_name(domain)
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Zone names that may serve `domain`, most specific first
///
/// `app.example.co.uk` yields `app.example.co.uk`, `example.co.uk`, `co.uk`.
/// A single-label name is never a candidate.
pub fn zone_candidates(domain: &str) -> Vec<String> {
    let domain = normalize_name(domain);
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 2 {
        return vec![domain];
    }
    (0..=labels.len() - 2)
        .map(|start| labels[start..].join("."))
        .collect()
}
