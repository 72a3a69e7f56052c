//! TLS certificate contract

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Certificate API
#[async_trait]
pub trait CertificateApi: Send + Sync {
    /// Certificates whose primary name or SANs cover `domain`, any status
    async fn find_certificates(&self, domain: &str) -> Result<Vec<CertificateSummary>>;

    /// Request a DNS-validated certificate, returning its identifier
    async fn request_certificate(&self, domain: &str, sans: &[String]) -> Result<String>;

    /// Current status and validation options of a certificate
    async fn describe_certificate(&self, id: &str) -> Result<CertificateDetail>;
}

/// Certificate as returned by a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub id: String,
    pub domain: String,
    pub sans: Vec<String>,
    pub status: CertificateStatus,
}

/// Certificate with its DNS validation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateDetail {
    pub id: String,
    pub domain: String,
    pub sans: Vec<String>,
    pub status: CertificateStatus,

    /// One entry per SAN; `record` stays `None` until the CA publishes it
    pub validations: Vec<DomainValidation>,
}

impl CertificateDetail {
    /// Challenge records, once the CA exposes one for every SAN
    pub fn challenge_records(&self) -> Option<Vec<crate::dns::DnsRecord>> {
        if self.validations.is_empty() {
            return None;
        }
        self.validations
            .iter()
            .map(|v| v.record.clone())
            .collect::<Option<Vec<_>>>()
    }
}

/// Validation state of one SAN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainValidation {
    pub domain: String,
    pub record: Option<crate::dns::DnsRecord>,
    pub status: Option<String>,
}

/// Certificate status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    PendingValidation,
    Issued,
    Failed,
    ValidationTimedOut,
    Expired,
    Revoked,
    Inactive,
    Other(String),
}

impl CertificateStatus {
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "PENDING_VALIDATION" => CertificateStatus::PendingValidation,
            "ISSUED" => CertificateStatus::Issued,
            "FAILED" => CertificateStatus::Failed,
            "VALIDATION_TIMED_OUT" => CertificateStatus::ValidationTimedOut,
            "EXPIRED" => CertificateStatus::Expired,
            "REVOKED" => CertificateStatus::Revoked,
            "INACTIVE" => CertificateStatus::Inactive,
            other => CertificateStatus::Other(other.to_string()),
        }
    }

    /// No further transition will happen without a new request
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            CertificateStatus::PendingValidation | CertificateStatus::Other(_)
        )
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CertificateStatus::PendingValidation => write!(f, "PENDING_VALIDATION"),
            CertificateStatus::Issued => write!(f, "ISSUED"),
            CertificateStatus::Failed => write!(f, "FAILED"),
            CertificateStatus::ValidationTimedOut => write!(f, "VALIDATION_TIMED_OUT"),
            CertificateStatus::Expired => write!(f, "EXPIRED"),
            CertificateStatus::Revoked => write!(f, "REVOKED"),
            CertificateStatus::Inactive => write!(f, "INACTIVE"),
            CertificateStatus::Other(s) => write!(f, "{}", s),
        }
    }
}
