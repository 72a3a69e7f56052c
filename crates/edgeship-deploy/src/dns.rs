//! DNS reconciliation
//!
//! Points a domain at the distribution through whichever [`DnsProvider`] is active.
//! Only the records this engine owns are written; unrelated records are left alone.

use crate::error::Result;
use crate::hosting::{HostingTarget, classify_target};
use edgeship_cloud::dns::{first_label, is_apex_domain, names_equal, normalize_name};
use edgeship_cloud::{DnsProvider, DnsRecord, RecordChange, RecordType};
use serde::{Deserialize, Serialize};

/// An existing record sending the domain somewhere else
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConflict {
    pub record: DnsRecord,
    pub hosting: HostingTarget,
}

impl std::fmt::Display for DnsConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} currently points at {} ({})",
            self.record.name, self.hosting, self.record.content
        )
    }
}

/// Decides whether a foreign record may be replaced
pub trait ConflictResolver: Send + Sync {
    /// `true` to delete the record and continue, `false` to skip the deployment
    fn confirm_migration(&self, conflict: &DnsConflict) -> bool;
}

/// Resolver that answers the same for every conflict
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConflictResolver for FixedAnswer {
    fn confirm_migration(&self, _conflict: &DnsConflict) -> bool {
        self.0
    }
}

/// Result of inspecting the domain's current records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck {
    /// No CNAME for the domain
    Clear,
    /// Already points at our CDN
    AlreadyServed(DnsRecord),
    /// Points at another host
    Conflict(DnsConflict),
}

/// Whether an observed record name refers to `domain`
///
/// Providers report either fully qualified names or zone-relative labels.
fn name_matches(observed: &str, domain: &str) -> bool {
    names_equal(observed, domain) || names_equal(observed, &first_label(domain))
}

/// Look for a CNAME on the domain and classify its target
pub async fn precheck(dns: &dyn DnsProvider, domain: &str) -> Result<Precheck> {
    let records = dns.list_records(domain).await?;

    let Some(existing) = records
        .into_iter()
        .find(|r| r.record_type == RecordType::Cname && name_matches(&r.name, domain))
    else {
        return Ok(Precheck::Clear);
    };

    let hosting = classify_target(&existing.content);
    tracing::debug!("{} is a CNAME to {} ({})", domain, existing.content, hosting);

    if hosting.is_own_cdn() {
        Ok(Precheck::AlreadyServed(existing))
    } else {
        Ok(Precheck::Conflict(DnsConflict {
            record: existing,
            hosting,
        }))
    }
}

/// Outcome of one record write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRecord {
    pub record: DnsRecord,
    pub change: RecordChange,
}

/// Result of pointing the domain at the distribution
#[derive(Debug, Clone, Default)]
pub struct DnsApplyReport {
    /// Records written successfully
    pub applied: Vec<AppliedRecord>,

    /// Set when the record for the domain itself could not be written
    pub primary_error: Option<String>,

    /// Failures of secondary records (e.g., www)
    pub warnings: Vec<String>,
}

impl DnsApplyReport {
    pub fn primary_succeeded(&self) -> bool {
        self.primary_error.is_none()
    }

    /// Every write was a no-op
    pub fn unchanged(&self) -> bool {
        self.applied
            .iter()
            .all(|r| r.change == RecordChange::Unchanged)
    }
}

async fn upsert(dns: &dyn DnsProvider, zone: &str, record: DnsRecord) -> std::result::Result<AppliedRecord, String> {
    match dns.upsert_record(zone, &record).await {
        Ok(change) => {
            tracing::info!("DNS {} ({})", record, change);
            Ok(AppliedRecord { record, change })
        }
        Err(e) => Err(format!("{}: {}", record, e)),
    }
}

/// Apex strategy: alias when supported, CNAME only where the provider tolerates it
async fn apply_apex(
    dns: &dyn DnsProvider,
    domain: &str,
    target: &str,
    report: &mut DnsApplyReport,
) {
    let caps = dns.capabilities();
    let mut errors = Vec::new();

    if caps.alias_records {
        match upsert(dns, domain, DnsRecord::alias(domain, target)).await {
            Ok(applied) => {
                report.applied.push(applied);
                return;
            }
            Err(e) => {
                tracing::warn!("Alias record rejected: {}", e);
                errors.push(e);
            }
        }
    }

    if caps.apex_cname {
        match upsert(dns, domain, DnsRecord::cname(domain, target)).await {
            Ok(applied) => {
                report.applied.push(applied);
                return;
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        errors.push(format!(
            "{} supports neither alias records nor CNAME at the apex",
            dns.display_name()
        ));
    }
    report.primary_error = Some(errors.join("; "));
}

/// Upsert the records pointing `domain` at `target`
///
/// - apex: one apex record (alias or CNAME) plus `www.<domain>` CNAME
/// - subdomain: a single CNAME
///
/// A failed secondary record is reported as a warning; only the primary record
/// decides success.
pub async fn apply(dns: &dyn DnsProvider, domain: &str, target: &str) -> Result<DnsApplyReport> {
    let domain = normalize_name(domain);
    let mut report = DnsApplyReport::default();

    if is_apex_domain(&domain) {
        apply_apex(dns, &domain, target, &mut report).await;

        // apex の結果に関わらず www は常に設定する
        let www = format!("www.{}", domain);
        match upsert(dns, &domain, DnsRecord::cname(&www, target)).await {
            Ok(applied) => report.applied.push(applied),
            Err(e) => {
                tracing::warn!("www record failed: {}", e);
                report.warnings.push(e);
            }
        }
    } else {
        match upsert(dns, &domain, DnsRecord::cname(&domain, target)).await {
            Ok(applied) => report.applied.push(applied),
            Err(e) => report.primary_error = Some(e),
        }
    }

    Ok(report)
}

/// Records of `domain` (and its www) that target `target`
pub async fn owned_records(dns: &dyn DnsProvider, domain: &str, target: &str) -> Result<Vec<DnsRecord>> {
    let domain = normalize_name(domain);
    let www = format!("www.{}", domain);
    let records = dns.list_records(&domain).await?;

    Ok(records
        .into_iter()
        .filter(|r| r.record_type.targets_host())
        .filter(|r| name_matches(&r.name, &domain) || names_equal(&r.name, &www))
        .filter(|r| names_equal(&r.content, target))
        .collect())
}
