//! ACM certificate adapter
//!
//! CloudFront only accepts certificates from `us-east-1`, so the client is pinned
//! to that region regardless of where the stack lives.

use crate::error::AwsError;
use async_trait::async_trait;
use aws_sdk_acm::Client;
use aws_sdk_acm::config::Region;
use aws_sdk_acm::types::{
    CertificateDetail as AcmDetail, CertificateStatus as AcmStatus, ValidationMethod,
};
use edgeship_cloud::dns::{names_equal, normalize_name};
use edgeship_cloud::{
    CertificateApi, CertificateDetail, CertificateStatus, CertificateSummary, DnsRecord,
    DomainValidation,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Region CloudFront reads viewer certificates from
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// [`CertificateApi`] over ACM
pub struct AcmCertificates {
    client: Client,
}

impl AcmCertificates {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        let acm_config = aws_sdk_acm::config::Builder::from(config)
            .region(Region::new(CERTIFICATE_REGION))
            .build();
        Self {
            client: Client::from_conf(acm_config),
        }
    }
}

/// Whether certificate name `name` (possibly a wildcard) serves `domain`
fn name_covers(name: &str, domain: &str) -> bool {
    if names_equal(name, domain) {
        return true;
    }
    let name = normalize_name(name);
    let domain = normalize_name(domain);
    match (name.strip_prefix("*."), domain.split_once('.')) {
        (Some(parent), Some((_, domain_parent))) => parent == domain_parent,
        _ => false,
    }
}

/// ACM idempotency token (alphanumeric, at most 32 characters)
///
/// Repeating a request with the same names inside an hour returns the certificate
/// created by the first one.
fn idempotency_token(domain: &str, sans: &[String]) -> String {
    let mut names: Vec<String> = sans.iter().map(|s| normalize_name(s)).collect();
    names.sort();
    let mut hasher = DefaultHasher::new();
    normalize_name(domain).hash(&mut hasher);
    names.hash(&mut hasher);

    let prefix: String = domain
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(16)
        .collect();
    format!("{}{:016x}", prefix, hasher.finish())
}

fn detail(id: &str, certificate: &AcmDetail) -> CertificateDetail {
    let validations = certificate
        .domain_validation_options()
        .iter()
        .map(|validation| DomainValidation {
            domain: validation.domain_name().to_string(),
            record: validation
                .resource_record()
                .map(|record| DnsRecord::cname(record.name(), record.value())),
            status: validation
                .validation_status()
                .map(|s| s.as_str().to_string()),
        })
        .collect();

    CertificateDetail {
        id: id.to_string(),
        domain: certificate.domain_name().unwrap_or_default().to_string(),
        sans: certificate.subject_alternative_names().to_vec(),
        status: status(certificate.status()),
        validations,
    }
}

fn status(status: Option<&AcmStatus>) -> CertificateStatus {
    status
        .map(|s| CertificateStatus::parse(s.as_str()))
        .unwrap_or_else(|| CertificateStatus::Other("UNKNOWN".to_string()))
}

#[async_trait]
impl CertificateApi for AcmCertificates {
    async fn find_certificates(&self, domain: &str) -> edgeship_cloud::Result<Vec<CertificateSummary>> {
        let mut found = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_certificates()
                .certificate_statuses(AcmStatus::Issued)
                .certificate_statuses(AcmStatus::PendingValidation)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AwsError::api("ListCertificates", e))?;

            for summary in output.certificate_summary_list() {
                let Some(arn) = summary.certificate_arn() else {
                    continue;
                };
                let primary = summary.domain_name().unwrap_or_default();
                let sans = summary.subject_alternative_name_summaries().to_vec();

                if !name_covers(primary, domain) && !sans.iter().any(|s| name_covers(s, domain)) {
                    continue;
                }

                found.push(CertificateSummary {
                    id: arn.to_string(),
                    domain: primary.to_string(),
                    sans,
                    status: status(summary.status()),
                });
            }

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        tracing::debug!("Found {} certificates for {}", found.len(), domain);
        Ok(found)
    }

    async fn request_certificate(&self, domain: &str, sans: &[String]) -> edgeship_cloud::Result<String> {
        tracing::info!("RequestCertificate {} {:?}", domain, sans);
        let output = self
            .client
            .request_certificate()
            .domain_name(domain)
            .set_subject_alternative_names(Some(sans.to_vec()))
            .validation_method(ValidationMethod::Dns)
            .idempotency_token(idempotency_token(domain, sans))
            .send()
            .await
            .map_err(|e| AwsError::api("RequestCertificate", e))?;

        let arn = output
            .certificate_arn()
            .ok_or(AwsError::MissingField("CertificateArn"))?;
        Ok(arn.to_string())
    }

    async fn describe_certificate(&self, id: &str) -> edgeship_cloud::Result<CertificateDetail> {
        let output = self
            .client
            .describe_certificate()
            .certificate_arn(id)
            .send()
            .await
            .map_err(|e| AwsError::api("DescribeCertificate", e))?;

        let certificate = output
            .certificate()
            .ok_or(AwsError::MissingField("Certificate"))?;
        Ok(detail(id, certificate))
    }
}
