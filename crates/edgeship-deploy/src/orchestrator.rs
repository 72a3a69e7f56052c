//! Deployment orchestrator
//!
//! Sequences one reconciliation run:
//!
//! ```text
//! capability → DNS pre-check → adoption → certificate → stack → DNS apply → publish
//! ```
//!
//! Every stage either continues, finishes the run with an outcome, or fails it with
//! the stage's own message. Nothing that already converged is rolled back.

use crate::certificate::{self, CertificateOutcome, CertificateRequest};
use crate::discovery::{self, AdoptedInfrastructure, Discovery};
use crate::dns::{self, ConflictResolver, Precheck};
use crate::error::{DeployError, Result};
use crate::result::{DeploymentOutcome, ReconciliationResult};
use crate::stack::{
    self, ExistingStack, StackOutcome, TeardownOutcome, is_account_verification_error,
};
use crate::timing::Timings;
use edgeship_cloud::stack::{OUTPUT_BUCKET_NAME, OUTPUT_DISTRIBUTION_DOMAIN, OUTPUT_DISTRIBUTION_ID};
use edgeship_cloud::{
    CdnApi, CertificateApi, CertificateSummary, DnsProvider, DnsRecord, SitePublisher,
    StackApi, StackDescription, StackRequest, StackTemplate, StorageApi, TemplateInput,
};
use edgeship_core::DeploymentSpec;
use serde::Serialize;
use std::sync::Arc;

/// Message returned when the CDN refuses new distributions on an unverified account
pub const ACCOUNT_VERIFICATION_MESSAGE: &str = "This AWS account must be verified before it can create CloudFront distributions. \
     Ask AWS Support to verify the account, then run deploy again; resources created so far are kept and will be reused.";

/// Cloud-side collaborators of the native backend
#[derive(Clone)]
pub struct CloudServices {
    pub stacks: Arc<dyn StackApi>,
    pub storage: Arc<dyn StorageApi>,
    pub cdn: Arc<dyn CdnApi>,
    pub certificates: Arc<dyn CertificateApi>,
    pub template: Arc<dyn StackTemplate>,
}

/// Read-only view of a deployed site
#[derive(Debug, Clone, Serialize)]
pub struct SiteStatus {
    pub site: String,
    pub domain: String,
    pub stack: Option<StackDescription>,
    pub certificate: Option<CertificateSummary>,
    pub records: Vec<DnsRecord>,
}

/// Drives reconciliation runs for one DNS provider
pub struct Orchestrator {
    cloud: CloudServices,
    dns: Arc<dyn DnsProvider>,
    publisher: Option<Arc<dyn SitePublisher>>,
    timings: Timings,
}

/// Resources the site is served from once the stack (or adoption) settled
struct Serving {
    distribution_id: String,
    distribution_domain: String,
    bucket_name: String,
}

impl From<AdoptedInfrastructure> for Serving {
    fn from(adopted: AdoptedInfrastructure) -> Self {
        Self {
            distribution_id: adopted.distribution_id,
            distribution_domain: adopted.distribution_domain,
            bucket_name: adopted.bucket_name,
        }
    }
}

impl Serving {
    fn from_stack(description: &StackDescription) -> Result<Self> {
        let output = |key: &'static str| {
            description
                .output(key)
                .map(str::to_string)
                .ok_or(DeployError::MissingOutput(key))
        };
        Ok(Self {
            distribution_id: output(OUTPUT_DISTRIBUTION_ID)?,
            distribution_domain: output(OUTPUT_DISTRIBUTION_DOMAIN)?,
            bucket_name: output(OUTPUT_BUCKET_NAME)?,
        })
    }

    fn record(&self, result: &mut ReconciliationResult) {
        result.distribution_id = Some(self.distribution_id.clone());
        result.distribution_domain = Some(self.distribution_domain.clone());
        result.bucket_name = Some(self.bucket_name.clone());
    }
}

impl Orchestrator {
    pub fn new(cloud: CloudServices, dns: Arc<dyn DnsProvider>) -> Self {
        Self {
            cloud,
            dns,
            publisher: None,
            timings: Timings::default(),
        }
    }

    /// Upload the site and invalidate the CDN after each successful run
    pub fn with_publisher(mut self, publisher: Arc<dyn SitePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Run one reconciliation; never panics and never returns an error
    pub async fn deploy(
        &self,
        spec: &DeploymentSpec,
        resolver: &dyn ConflictResolver,
    ) -> ReconciliationResult {
        let mut result = ReconciliationResult::new(&spec.site, &spec.domain);
        tracing::info!("Deploying {} ({})", spec.site, spec.domain);

        if let Err(e) = self.run(spec, resolver, &mut result).await {
            tracing::error!("Deployment of {} failed: {}", spec.domain, e);
            result.fail(e.to_string());
        }
        result
    }

    async fn run(
        &self,
        spec: &DeploymentSpec,
        resolver: &dyn ConflictResolver,
        result: &mut ReconciliationResult,
    ) -> Result<()> {
        let domain = spec.domain.as_str();

        // 1. capability
        if !self.dns.can_manage_domain(domain).await? {
            result.fail(format!(
                "{} cannot manage DNS for {}; check the zone configuration and credentials",
                self.dns.display_name(),
                domain
            ));
            return Ok(());
        }

        // 2. DNS pre-check, before any mutation
        match dns::precheck(self.dns.as_ref(), domain).await? {
            Precheck::Clear => {}
            Precheck::AlreadyServed(record) => {
                tracing::debug!("{} already points at {}", domain, record.content);
            }
            Precheck::Conflict(conflict) => {
                if !resolver.confirm_migration(&conflict) {
                    result.finish(
                        DeploymentOutcome::Skipped,
                        format!("Skipped {}: {}", domain, conflict),
                    );
                    return Ok(());
                }
                tracing::info!("Removing foreign record {}", conflict.record);
                self.dns.delete_record(domain, &conflict.record).await?;
            }
        }

        // 3. adoption, unless this site already has a stack that can be updated
        let bucket_name = match stack::inspect(
            self.cloud.stacks.as_ref(),
            &spec.stack_name,
            &self.timings.stack,
        )
        .await?
        {
            ExistingStack::TimedOut(reason) => {
                result.fail(format!("Stack {} failed: {}", spec.stack_name, reason));
                return Ok(());
            }
            ExistingStack::Live(description) => description
                .output(OUTPUT_BUCKET_NAME)
                .map(str::to_string)
                .unwrap_or_else(|| spec.bucket_name.clone()),
            ExistingStack::Absent | ExistingStack::Replaceable(_) => {
                let discovery = discovery::discover(
                    self.cloud.cdn.as_ref(),
                    self.cloud.storage.as_ref(),
                    domain,
                    &spec.bucket_name,
                    self.timings.orphan_cleanup_budget,
                )
                .await?;
                match discovery {
                    Discovery::Adopted(adopted) => {
                        return self.finish_adopted(spec, adopted.into(), result).await;
                    }
                    Discovery::NotFound { bucket_name } => {
                        if bucket_name != spec.bucket_name {
                            result.warnings.push(format!(
                                "Bucket {} could not be reclaimed; using {}",
                                spec.bucket_name, bucket_name
                            ));
                        }
                        bucket_name
                    }
                }
            }
        };

        // 4. certificate
        let outcome = match &spec.certificate_id {
            Some(id) => {
                certificate::use_existing(self.cloud.certificates.as_ref(), id, domain).await?
            }
            None => {
                let request = CertificateRequest::from(spec);
                certificate::ensure_certificate(
                    self.cloud.certificates.as_ref(),
                    self.dns.as_ref(),
                    &request,
                    &self.timings.certificate_options,
                    &self.timings.certificate_issuance(request.wait_minutes),
                )
                .await?
            }
        };

        let certificate_id = match &outcome {
            CertificateOutcome::Issued(state) => state.id.clone(),
            _ => {
                if let CertificateOutcome::Rejected(state)
                | CertificateOutcome::TimedOut { state, .. } = &outcome
                {
                    result.certificate_id = Some(state.id.clone());
                }
                result.fail(outcome.failure_message().unwrap_or_default());
                return Ok(());
            }
        };
        result.certificate_id = Some(certificate_id.clone());

        // 5. stack
        let request = self.stack_request(spec, &bucket_name, &certificate_id)?;
        let converged =
            stack::converge(self.cloud.stacks.as_ref(), &request, &self.timings.stack).await?;
        let (serving, mut kind) = match converged {
            StackOutcome::Failed(reason) if is_account_verification_error(&reason) => {
                tracing::warn!("Stack creation blocked by account verification: {}", reason);
                return match discovery::find_adoptable(self.cloud.cdn.as_ref(), domain).await? {
                    Some(adopted) => {
                        result.warnings.push(ACCOUNT_VERIFICATION_MESSAGE.to_string());
                        self.finish_adopted(spec, adopted.into(), result).await
                    }
                    None => {
                        result.fail(ACCOUNT_VERIFICATION_MESSAGE);
                        Ok(())
                    }
                };
            }
            StackOutcome::Failed(reason) => {
                result.fail(format!("Stack {} failed: {}", spec.stack_name, reason));
                return Ok(());
            }
            settled => {
                let kind = match &settled {
                    StackOutcome::Created(_) => DeploymentOutcome::Created,
                    StackOutcome::Updated(_) => DeploymentOutcome::Updated,
                    _ => DeploymentOutcome::Unchanged,
                };
                let description = settled
                    .description()
                    .ok_or(DeployError::MissingOutput(OUTPUT_DISTRIBUTION_ID))?;
                (Serving::from_stack(description)?, kind)
            }
        };
        serving.record(result);

        // 6. DNS apply
        let report = dns::apply(self.dns.as_ref(), domain, &serving.distribution_domain).await?;
        result.warnings.extend(report.warnings.iter().cloned());
        if let Some(error) = &report.primary_error {
            result.fail(format!("DNS record for {} could not be written: {}", domain, error));
            return Ok(());
        }
        if kind == DeploymentOutcome::Unchanged && !report.unchanged() {
            kind = DeploymentOutcome::Updated;
        }

        // 7. publish
        self.publish(spec, &serving).await?;

        let message = match kind {
            DeploymentOutcome::Created => format!(
                "Deployed {} on new distribution {}",
                domain, serving.distribution_id
            ),
            DeploymentOutcome::Updated => format!(
                "Updated {} on distribution {}",
                domain, serving.distribution_id
            ),
            _ => format!("{} is up to date", domain),
        };
        result.finish(kind, message);
        Ok(())
    }

    async fn finish_adopted(
        &self,
        spec: &DeploymentSpec,
        serving: Serving,
        result: &mut ReconciliationResult,
    ) -> Result<()> {
        tracing::info!(
            "Adopting distribution {} with bucket {}",
            serving.distribution_id,
            serving.bucket_name
        );
        serving.record(result);
        self.publish(spec, &serving).await?;
        result.finish(
            DeploymentOutcome::Adopted,
            format!(
                "{} is already served by distribution {}; reusing it",
                spec.domain, serving.distribution_id
            ),
        );
        Ok(())
    }

    fn stack_request(
        &self,
        spec: &DeploymentSpec,
        bucket_name: &str,
        certificate_id: &str,
    ) -> Result<StackRequest> {
        let input = TemplateInput {
            site: spec.site.clone(),
            bucket_name: bucket_name.to_string(),
            aliases: spec.aliases(),
            certificate_id: certificate_id.to_string(),
            index_document: spec.index_document.clone(),
            error_document: spec.error_document.clone(),
            min_ttl: spec.cache.min_ttl.into(),
            default_ttl: spec.cache.default_ttl.into(),
            max_ttl: spec.cache.max_ttl.into(),
            price_class: spec.price_class.clone(),
        };
        let template_body = self
            .cloud
            .template
            .render(&input)
            .map_err(|e| DeployError::Template(e.to_string()))?;

        Ok(StackRequest {
            name: spec.stack_name.clone(),
            template_body,
            parameters: Default::default(),
            tags: spec.stack_tags().into_iter().collect(),
            delete_on_failure: true,
        })
    }

    async fn publish(&self, spec: &DeploymentSpec, serving: &Serving) -> Result<()> {
        let (Some(publisher), Some(source)) = (&self.publisher, &spec.source_dir) else {
            return Ok(());
        };

        let report = publisher
            .sync(source, &serving.bucket_name)
            .await
            .map_err(|e| DeployError::Publish(e.to_string()))?;
        tracing::info!(
            "Uploaded {} files ({} bytes) to {}",
            report.uploaded,
            report.bytes,
            serving.bucket_name
        );

        let invalidation = self
            .cloud
            .cdn
            .create_invalidation(&serving.distribution_id, &["/*".to_string()])
            .await
            .map_err(|e| DeployError::Publish(e.to_string()))?;
        tracing::info!("Invalidation {} created", invalidation);
        Ok(())
    }

    /// Remove the DNS records and the stack of a site
    ///
    /// The origin bucket is emptied first so the stack can delete it. Certificates
    /// are left in place.
    pub async fn teardown(&self, spec: &DeploymentSpec) -> ReconciliationResult {
        let mut result = ReconciliationResult::new(&spec.site, &spec.domain);
        if let Err(e) = self.run_teardown(spec, &mut result).await {
            tracing::error!("Teardown of {} failed: {}", spec.domain, e);
            result.fail(e.to_string());
        }
        result
    }

    async fn run_teardown(&self, spec: &DeploymentSpec, result: &mut ReconciliationResult) -> Result<()> {
        let Some(description) = self
            .cloud
            .stacks
            .describe_stack(&spec.stack_name)
            .await?
            .filter(|d| !d.status.is_deleted())
        else {
            result.finish(
                DeploymentOutcome::Destroyed,
                format!("Stack {} does not exist; nothing to destroy", spec.stack_name),
            );
            return Ok(());
        };

        if let Some(target) = description.output(OUTPUT_DISTRIBUTION_DOMAIN) {
            result.distribution_domain = Some(target.to_string());
            for record in dns::owned_records(self.dns.as_ref(), &spec.domain, target).await? {
                match self.dns.delete_record(&spec.domain, &record).await {
                    Ok(()) => tracing::info!("Deleted DNS record {}", record),
                    Err(e) => result
                        .warnings
                        .push(format!("Could not delete {}: {}", record, e)),
                }
            }
        }
        result.distribution_id = description.output(OUTPUT_DISTRIBUTION_ID).map(str::to_string);

        if let Some(bucket) = description.output(OUTPUT_BUCKET_NAME) {
            result.bucket_name = Some(bucket.to_string());
            if self.cloud.storage.bucket_exists(bucket).await? {
                self.cloud.storage.empty_bucket(bucket).await?;
            }
        }

        match stack::teardown(self.cloud.stacks.as_ref(), &spec.stack_name, &self.timings.stack).await? {
            TeardownOutcome::Deleted | TeardownOutcome::Absent => {
                result.finish(
                    DeploymentOutcome::Destroyed,
                    format!("Destroyed stack {}", spec.stack_name),
                );
            }
            TeardownOutcome::Failed(reason) => {
                result.fail(format!("Deleting stack {} failed: {}", spec.stack_name, reason));
            }
        }
        Ok(())
    }

    /// Current stack, certificate and DNS records of a site
    pub async fn status(&self, spec: &DeploymentSpec) -> Result<SiteStatus> {
        let stack = self.cloud.stacks.describe_stack(&spec.stack_name).await?;

        let certificate = self
            .cloud
            .certificates
            .find_certificates(&spec.domain)
            .await?
            .into_iter()
            .filter(|c| certificate::is_sufficient(c, &spec.domain))
            .min_by_key(|c| c.status != edgeship_cloud::CertificateStatus::Issued);

        let www = spec.www_domain();
        let records = self
            .dns
            .list_records(&spec.domain)
            .await?
            .into_iter()
            .filter(|r| {
                edgeship_cloud::dns::names_equal(&r.name, &spec.domain)
                    || www
                        .as_deref()
                        .is_some_and(|w| edgeship_cloud::dns::names_equal(&r.name, w))
            })
            .collect();

        Ok(SiteStatus {
            site: spec.site.clone(),
            domain: spec.domain.clone(),
            stack,
            certificate,
            records,
        })
    }
}
