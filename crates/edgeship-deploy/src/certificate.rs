//! Certificate lifecycle
//!
//! request → DNS challenge publication → poll until issued.

use crate::error::Result;
use edgeship_cloud::dns::{is_apex_domain, names_equal, normalize_name};
use edgeship_core::DeploymentSpec;
use edgeship_cloud::{
    CertificateApi, CertificateDetail, CertificateStatus, CertificateSummary, CloudError,
    DnsProvider, DnsRecord, Poll, PollOutcome, PollPolicy, poll_until,
};
use serde::{Deserialize, Serialize};

/// What the caller needs covered
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub domain: String,
    /// Names a newly requested certificate carries, primary first
    pub sans: Vec<String>,
    /// Issuance polling budget in minutes
    pub wait_minutes: u32,
}

impl From<&DeploymentSpec> for CertificateRequest {
    fn from(spec: &DeploymentSpec) -> Self {
        Self {
            domain: spec.domain.clone(),
            sans: spec.required_sans(),
            wait_minutes: spec.certificate_wait_minutes,
        }
    }
}

/// Certificate as tracked through one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateState {
    pub id: String,
    pub status: CertificateStatus,
    pub sans: Vec<String>,
    pub challenge_records: Vec<DnsRecord>,
}

impl CertificateState {
    fn from_detail(detail: &CertificateDetail) -> Self {
        Self {
            id: detail.id.clone(),
            status: detail.status.clone(),
            sans: detail.sans.clone(),
            challenge_records: detail.challenge_records().unwrap_or_default(),
        }
    }
}

/// Which wait ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateWait {
    ValidationOptions,
    Issuance,
}

/// Result of ensuring a certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateOutcome {
    Issued(CertificateState),
    /// Reached a terminal status other than issued
    Rejected(CertificateState),
    TimedOut {
        waiting_for: CertificateWait,
        state: CertificateState,
    },
}

impl CertificateOutcome {
    /// Operator-facing description of a non-issued outcome
    pub fn failure_message(&self) -> Option<String> {
        match self {
            CertificateOutcome::Issued(_) => None,
            CertificateOutcome::Rejected(state) => Some(format!(
                "Certificate {} was not issued (status {})",
                state.id, state.status
            )),
            CertificateOutcome::TimedOut {
                waiting_for: CertificateWait::ValidationOptions,
                state,
            } => Some(format!(
                "Timeout waiting for DNS validation options of certificate {}",
                state.id
            )),
            CertificateOutcome::TimedOut {
                waiting_for: CertificateWait::Issuance,
                state,
            } => Some(format!(
                "Timeout waiting for certificate {} to be issued (last status {})",
                state.id, state.status
            )),
        }
    }
}

/// Whether `sans` covers `name` exactly or through a single-label wildcard
pub fn covers(sans: &[String], name: &str) -> bool {
    let name = normalize_name(name);
    sans.iter().any(|san| {
        let san = normalize_name(san);
        if san == name {
            return true;
        }
        match (san.strip_prefix("*."), name.split_once('.')) {
            (Some(parent), Some((_, rest))) => parent == rest,
            _ => false,
        }
    })
}

/// A certificate is sufficient when it covers the domain, and `www.<domain>` for an apex
pub fn is_sufficient(certificate: &CertificateSummary, domain: &str) -> bool {
    let mut names = certificate.sans.clone();
    names.push(certificate.domain.clone());

    if !covers(&names, domain) {
        return false;
    }
    if is_apex_domain(domain) {
        return covers(&names, &format!("www.{}", normalize_name(domain)));
    }
    true
}

/// Challenge publication summary
#[derive(Debug, Clone, Default)]
pub struct ChallengeReport {
    pub published: usize,
    pub failed: Vec<String>,
}

/// Upsert every challenge record; a failing record is logged and skipped
pub async fn publish_challenges(
    dns: &dyn DnsProvider,
    domain: &str,
    records: &[DnsRecord],
) -> ChallengeReport {
    let mut report = ChallengeReport::default();
    let mut seen: Vec<&DnsRecord> = Vec::new();

    for record in records {
        // apex と www で同じチャレンジレコードが返ることがある
        if seen.iter().any(|r| r.same_key(record) && r.same_content(record)) {
            continue;
        }
        seen.push(record);

        match dns.upsert_record(domain, record).await {
            Ok(change) => {
                tracing::info!("Challenge record {} {}", record.name, change);
                report.published += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to publish challenge record {}: {}", record.name, e);
                report.failed.push(format!("{}: {}", record.name, e));
            }
        }
    }

    report
}

async fn wait_for_validation_options(
    certificates: &dyn CertificateApi,
    id: &str,
    policy: &PollPolicy,
) -> Result<PollOutcome<CertificateDetail, CertificateDetail>> {
    Ok(poll_until(policy, |_| async move {
        let detail = certificates.describe_certificate(id).await?;
        if detail.status != CertificateStatus::PendingValidation {
            // 既に検証済み、または失敗済みならレコード待ちは不要
            return Ok::<_, CloudError>(Poll::Ready(detail));
        }
        if detail.challenge_records().is_some() {
            Ok(Poll::Ready(detail))
        } else {
            Ok(Poll::Pending(detail))
        }
    })
    .await?)
}

async fn wait_for_issuance(
    certificates: &dyn CertificateApi,
    id: &str,
    policy: &PollPolicy,
) -> Result<PollOutcome<CertificateDetail, CertificateDetail>> {
    Ok(poll_until(policy, |_| async move {
        let detail = certificates.describe_certificate(id).await?;
        if detail.status.is_terminal() {
            Ok::<_, CloudError>(Poll::Ready(detail))
        } else {
            tracing::debug!("Certificate {} is {}", id, detail.status);
            Ok(Poll::Pending(detail))
        }
    })
    .await?)
}

fn pending_state(id: &str, sans: Vec<String>) -> CertificateState {
    CertificateState {
        id: id.to_string(),
        status: CertificateStatus::PendingValidation,
        sans,
        challenge_records: Vec::new(),
    }
}

/// Pick an existing certificate: issued first, then one still pending validation
fn select_existing<'a>(
    candidates: &'a [CertificateSummary],
    domain: &str,
) -> Option<&'a CertificateSummary> {
    let sufficient = || candidates.iter().filter(|c| is_sufficient(c, domain));
    sufficient()
        .find(|c| c.status == CertificateStatus::Issued)
        .or_else(|| sufficient().find(|c| c.status == CertificateStatus::PendingValidation))
}

/// Ensure an issued certificate covers the request
pub async fn ensure_certificate(
    certificates: &dyn CertificateApi,
    dns: &dyn DnsProvider,
    request: &CertificateRequest,
    options_policy: &PollPolicy,
    issuance_policy: &PollPolicy,
) -> Result<CertificateOutcome> {
    let sans = &request.sans;
    let candidates = certificates.find_certificates(&request.domain).await?;

    let id = match select_existing(&candidates, &request.domain) {
        Some(existing) if existing.status == CertificateStatus::Issued => {
            tracing::info!("Reusing issued certificate {}", existing.id);
            return Ok(CertificateOutcome::Issued(CertificateState {
                id: existing.id.clone(),
                status: existing.status.clone(),
                sans: existing.sans.clone(),
                challenge_records: Vec::new(),
            }));
        }
        Some(pending) => {
            tracing::info!("Resuming validation of certificate {}", pending.id);
            pending.id.clone()
        }
        None => {
            if !candidates.is_empty() {
                tracing::info!(
                    "Existing certificates for {} do not cover {}; requesting a new one",
                    request.domain,
                    sans.join(", ")
                );
            }
            let id = certificates.request_certificate(&request.domain, sans).await?;
            tracing::info!("Requested certificate {} for {}", id, sans.join(", "));
            id
        }
    };

    validate(
        certificates,
        dns,
        &request.domain,
        &id,
        sans.clone(),
        options_policy,
        issuance_policy,
    )
    .await
}

/// Publish challenges for a known certificate and wait for issuance
async fn validate(
    certificates: &dyn CertificateApi,
    dns: &dyn DnsProvider,
    domain: &str,
    id: &str,
    sans: Vec<String>,
    options_policy: &PollPolicy,
    issuance_policy: &PollPolicy,
) -> Result<CertificateOutcome> {
    let detail = match wait_for_validation_options(certificates, id, options_policy).await? {
        PollOutcome::Ready(detail) => detail,
        PollOutcome::TimedOut { last, .. } => {
            let state = last
                .as_ref()
                .map(CertificateState::from_detail)
                .unwrap_or_else(|| pending_state(id, sans));
            return Ok(CertificateOutcome::TimedOut {
                waiting_for: CertificateWait::ValidationOptions,
                state,
            });
        }
    };

    match detail.status {
        CertificateStatus::Issued => {
            return Ok(CertificateOutcome::Issued(CertificateState::from_detail(&detail)));
        }
        CertificateStatus::PendingValidation => {}
        _ => return Ok(CertificateOutcome::Rejected(CertificateState::from_detail(&detail))),
    }

    let records = detail.challenge_records().unwrap_or_default();
    let report = publish_challenges(dns, domain, &records).await;
    tracing::info!(
        "Published {} challenge records ({} failed)",
        report.published,
        report.failed.len()
    );

    match wait_for_issuance(certificates, id, issuance_policy).await? {
        PollOutcome::Ready(detail) if detail.status == CertificateStatus::Issued => {
            tracing::info!("Certificate {} issued", id);
            Ok(CertificateOutcome::Issued(CertificateState::from_detail(&detail)))
        }
        PollOutcome::Ready(detail) => {
            Ok(CertificateOutcome::Rejected(CertificateState::from_detail(&detail)))
        }
        PollOutcome::TimedOut { last, .. } => {
            let state = last
                .as_ref()
                .map(CertificateState::from_detail)
                .unwrap_or_else(|| CertificateState {
                    challenge_records: records.clone(),
                    ..pending_state(id, detail.sans.clone())
                });
            Ok(CertificateOutcome::TimedOut {
                waiting_for: CertificateWait::Issuance,
                state,
            })
        }
    }
}

/// Check a pre-supplied certificate; it must already be issued and cover the domain
pub async fn use_existing(
    certificates: &dyn CertificateApi,
    id: &str,
    domain: &str,
) -> Result<CertificateOutcome> {
    let detail = certificates.describe_certificate(id).await?;
    let state = CertificateState::from_detail(&detail);

    let summary = CertificateSummary {
        id: detail.id.clone(),
        domain: detail.domain.clone(),
        sans: detail.sans.clone(),
        status: detail.status.clone(),
    };

    if detail.status == CertificateStatus::Issued && is_sufficient(&summary, domain) {
        Ok(CertificateOutcome::Issued(state))
    } else {
        if !names_equal(&detail.domain, domain) {
            tracing::warn!(
                "Certificate {} is for {}, not {}",
                detail.id,
                detail.domain,
                domain
            );
        }
        Ok(CertificateOutcome::Rejected(state))
    }
}
