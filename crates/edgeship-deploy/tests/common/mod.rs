//! In-memory cloud used by the engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use edgeship_cloud::dns::{is_apex_domain, names_equal};
use edgeship_cloud::stack::{OUTPUT_BUCKET_NAME, OUTPUT_DISTRIBUTION_DOMAIN, OUTPUT_DISTRIBUTION_ID};
use edgeship_cloud::{
    CdnApi, CertificateApi, CertificateDetail, CertificateStatus, CertificateSummary,
    CloudError, DistributionConfig, DistributionSummary, DnsProvider, DnsRecord,
    DomainValidation, Origin, ProviderCapabilities, RecordChange, RecordType, Result,
    SitePublisher, StackApi, StackDescription, StackRequest, StackState, StackTemplate,
    StorageApi, SyncReport, TemplateInput,
};
use edgeship_core::{DeploymentSpec, parse_site_string};
use edgeship_deploy::{CloudServices, Orchestrator, Timings};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const VERIFICATION_FAILURE: &str = "Resource handler returned message: \"Your account must be verified before you can add new CloudFront resources.\"";

#[derive(Debug, Clone)]
pub struct FakeStack {
    pub name: String,
    pub id: String,
    pub status: StackState,
    pub template_body: String,
    pub outputs: HashMap<String, String>,
    pub failure_reasons: Vec<String>,
    /// Statuses the stack moves through, one per describe
    pub transitions: VecDeque<StackState>,
}

#[derive(Debug, Clone)]
pub struct FakeCertificate {
    pub detail: CertificateDetail,
    /// Remaining describes before validation records show up
    pub options_delay: u32,
}

#[derive(Debug, Default)]
pub struct State {
    pub stacks: Vec<FakeStack>,
    pub buckets: HashSet<String>,
    pub stuck_buckets: HashSet<String>,
    pub distributions: Vec<(DistributionSummary, DistributionConfig)>,
    pub certificates: Vec<FakeCertificate>,
    pub records: Vec<DnsRecord>,
    pub invalidations: Vec<(String, Vec<String>)>,
    pub synced: Vec<(String, String)>,
    pub calls: Vec<String>,
    next_id: u32,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Every collaborator trait over one shared in-memory account
pub struct FakeCloud {
    pub state: Mutex<State>,
    pub capabilities: ProviderCapabilities,
    pub manages_domain: bool,
    /// Certificates are issued once all their challenge records exist
    pub auto_issue: bool,
    /// Describes before a newly requested certificate exposes challenge records
    pub options_delay: u32,
    /// Create requests end rolled back with this reason
    pub create_failure: Option<String>,
    /// Record names whose upserts are rejected
    pub rejected_names: Vec<String>,
}

impl FakeCloud {
    /// Route 53 like: alias records, no CNAME at the apex
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            capabilities: ProviderCapabilities {
                alias_records: true,
                apex_cname: false,
            },
            manages_domain: true,
            auto_issue: true,
            options_delay: 0,
            create_failure: None,
            rejected_names: Vec::new(),
        }
    }

    /// Cloudflare like: no alias records, CNAME flattening at the apex
    pub fn flattening() -> Self {
        Self {
            capabilities: ProviderCapabilities {
                alias_records: false,
                apex_cname: true,
            },
            ..Self::new()
        }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn add_record(&self, record: DnsRecord) {
        self.state.lock().unwrap().records.push(record);
    }

    pub fn add_bucket(&self, name: &str, stuck: bool) {
        let mut state = self.state.lock().unwrap();
        state.buckets.insert(name.to_string());
        if stuck {
            state.stuck_buckets.insert(name.to_string());
        }
    }

    pub fn has_bucket(&self, name: &str) -> bool {
        self.state.lock().unwrap().buckets.contains(name)
    }

    pub fn add_distribution(&self, id: &str, domain_name: &str, aliases: &[&str], origin: &str) {
        let summary = DistributionSummary {
            id: id.to_string(),
            domain_name: domain_name.to_string(),
            aliases: aliases
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .into(),
        };
        let config = DistributionConfig {
            origins: vec![Origin {
                id: "origin".to_string(),
                domain_name: origin.to_string(),
            }],
        };
        self.state
            .lock()
            .unwrap()
            .distributions
            .push((summary, config));
    }

    pub fn add_certificate(&self, domain: &str, sans: &[&str], status: CertificateStatus) -> String {
        let mut state = self.state.lock().unwrap();
        let id = format!("arn:aws:acm:us-east-1:123456789012:certificate/{}", state.next_id());
        let sans: Vec<String> = sans.iter().map(|s| s.to_string()).collect();
        state.certificates.push(FakeCertificate {
            detail: CertificateDetail {
                id: id.clone(),
                domain: domain.to_string(),
                validations: validations(&sans),
                sans,
                status,
            },
            options_delay: 0,
        });
        id
    }

    pub fn stack(&self, name: &str) -> Option<FakeStack> {
        self.state
            .lock()
            .unwrap()
            .stacks
            .iter()
            .rev()
            .find(|s| s.name == name)
            .cloned()
    }

    /// Stack left behind by an earlier run
    pub fn add_stack(&self, name: &str, status: StackState) {
        let mut state = self.state.lock().unwrap();
        let id = format!("arn:aws:cloudformation:stack/{}/{}", name, state.next_id());
        state.stacks.push(FakeStack {
            name: name.to_string(),
            id,
            status,
            template_body: "{}".to_string(),
            outputs: HashMap::new(),
            failure_reasons: Vec::new(),
            transitions: VecDeque::new(),
        });
    }

    pub fn set_stack_status(&self, name: &str, status: StackState) {
        let mut state = self.state.lock().unwrap();
        if let Some(stack) = state.stacks.iter_mut().rev().find(|s| s.name == name) {
            stack.status = status;
        }
    }

    /// Statuses the latest stack named `name` reports on its next describes
    pub fn script_stack(&self, name: &str, statuses: &[StackState]) {
        let mut state = self.state.lock().unwrap();
        if let Some(stack) = state.stacks.iter_mut().rev().find(|s| s.name == name) {
            stack.transitions = statuses.iter().cloned().collect();
        }
    }

    pub fn orchestrator(self: &Arc<Self>) -> Orchestrator {
        let cloud = CloudServices {
            stacks: self.clone(),
            storage: self.clone(),
            cdn: self.clone(),
            certificates: self.clone(),
            template: self.clone(),
        };
        Orchestrator::new(cloud, self.clone())
            .with_publisher(self.clone())
            .with_timings(Timings::immediate())
    }

    fn log(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn validations(sans: &[String]) -> Vec<DomainValidation> {
    sans.iter()
        .map(|san| DomainValidation {
            domain: san.clone(),
            record: Some(DnsRecord::cname(
                format!("_acme.{}", san),
                format!("_{}.acm-validations.aws", san.replace('.', "-")),
            )),
            status: None,
        })
        .collect()
}

fn stack_matches(stack: &FakeStack, name: &str) -> bool {
    stack.id == name || stack.name == name
}

#[async_trait]
impl StackApi for FakeCloud {
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>> {
        let mut state = self.state.lock().unwrap();
        let found = state.stacks.iter_mut().rev().find(|s| stack_matches(s, name));
        if let Some(stack) = found {
            if let Some(next) = stack.transitions.pop_front() {
                stack.status = next;
            }
        }
        let found = state.stacks.iter().rev().find(|s| stack_matches(s, name));
        Ok(match found {
            // 名前での参照では削除済みスタックは見えない
            Some(stack) if stack.id != name && stack.status == StackState::DeleteComplete => None,
            Some(stack) => Some(StackDescription {
                name: stack.name.clone(),
                id: Some(stack.id.clone()),
                status: stack.status.clone(),
                status_reason: None,
                outputs: stack.outputs.clone(),
            }),
            None => None,
        })
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<String> {
        self.log(format!("create_stack {}", request.name));
        let input: TemplateInput = serde_json::from_str(&request.template_body)?;

        let mut state = self.state.lock().unwrap();
        let n = state.next_id();
        let id = format!("arn:aws:cloudformation:stack/{}/{}", request.name, n);

        if let Some(reason) = &self.create_failure {
            state.stacks.push(FakeStack {
                name: request.name.clone(),
                id: id.clone(),
                status: StackState::DeleteComplete,
                template_body: request.template_body.clone(),
                outputs: HashMap::new(),
                failure_reasons: vec![reason.clone()],
                transitions: VecDeque::new(),
            });
            return Ok(id);
        }

        let distribution_id = format!("E{}FAKE", n);
        let distribution_domain = format!("d{}.cloudfront.net", n);
        let outputs = HashMap::from([
            (OUTPUT_BUCKET_NAME.to_string(), input.bucket_name.clone()),
            (OUTPUT_DISTRIBUTION_ID.to_string(), distribution_id.clone()),
            (OUTPUT_DISTRIBUTION_DOMAIN.to_string(), distribution_domain.clone()),
        ]);
        state.buckets.insert(input.bucket_name.clone());
        state.distributions.push((
            DistributionSummary {
                id: distribution_id,
                domain_name: distribution_domain,
                aliases: input.aliases.clone().into(),
            },
            DistributionConfig {
                origins: vec![Origin {
                    id: "site".to_string(),
                    domain_name: format!("{}.s3.us-east-1.amazonaws.com", input.bucket_name),
                }],
            },
        ));
        state.stacks.push(FakeStack {
            name: request.name.clone(),
            id: id.clone(),
            status: StackState::CreateComplete,
            template_body: request.template_body.clone(),
            outputs,
            failure_reasons: Vec::new(),
            transitions: VecDeque::new(),
        });
        Ok(id)
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<String> {
        self.log(format!("update_stack {}", request.name));
        let mut state = self.state.lock().unwrap();
        let stack = state
            .stacks
            .iter_mut()
            .rev()
            .find(|s| s.name == request.name && s.status != StackState::DeleteComplete)
            .ok_or_else(|| CloudError::ResourceNotFound(request.name.clone()))?;

        if stack.template_body == request.template_body {
            return Err(CloudError::ApiError(
                "ValidationError: No updates are to be performed.".to_string(),
            ));
        }
        stack.template_body = request.template_body.clone();
        stack.status = StackState::UpdateComplete;
        Ok(stack.id.clone())
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        self.log(format!("delete_stack {}", name));
        let mut state = self.state.lock().unwrap();
        let Some(stack) = state.stacks.iter_mut().rev().find(|s| stack_matches(s, name)) else {
            return Ok(());
        };
        stack.status = StackState::DeleteComplete;
        let outputs = stack.outputs.clone();

        // スタックが所有するバケットとディストリビューションも消える
        if let Some(bucket) = outputs.get(OUTPUT_BUCKET_NAME) {
            state.buckets.remove(bucket);
        }
        if let Some(id) = outputs.get(OUTPUT_DISTRIBUTION_ID) {
            state.distributions.retain(|(s, _)| &s.id != id);
        }
        Ok(())
    }

    async fn failure_reasons(&self, name: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .stacks
            .iter()
            .rev()
            .find(|s| stack_matches(s, name))
            .map(|s| s.failure_reasons.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl StorageApi for FakeCloud {
    async fn bucket_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().buckets.contains(name))
    }

    async fn empty_bucket(&self, name: &str) -> Result<()> {
        self.log(format!("empty_bucket {}", name));
        if self.state.lock().unwrap().stuck_buckets.contains(name) {
            return Err(CloudError::ApiError(format!("AccessDenied: {}", name)));
        }
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        self.log(format!("delete_bucket {}", name));
        self.state.lock().unwrap().buckets.remove(name);
        Ok(())
    }
}

#[async_trait]
impl CdnApi for FakeCloud {
    async fn list_distributions(&self) -> Result<Vec<DistributionSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state.distributions.iter().map(|(s, _)| s.clone()).collect())
    }

    async fn get_distribution_config(&self, id: &str) -> Result<DistributionConfig> {
        let state = self.state.lock().unwrap();
        state
            .distributions
            .iter()
            .find(|(s, _)| s.id == id)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))
    }

    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.invalidations.push((id.to_string(), paths.to_vec()));
        Ok(format!("I{}", state.invalidations.len()))
    }
}

#[async_trait]
impl CertificateApi for FakeCloud {
    async fn find_certificates(&self, domain: &str) -> Result<Vec<CertificateSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .certificates
            .iter()
            .filter(|c| {
                names_equal(&c.detail.domain, domain)
                    || c.detail.sans.iter().any(|s| names_equal(s, domain))
            })
            .map(|c| CertificateSummary {
                id: c.detail.id.clone(),
                domain: c.detail.domain.clone(),
                sans: c.detail.sans.clone(),
                status: c.detail.status.clone(),
            })
            .collect())
    }

    async fn request_certificate(&self, domain: &str, sans: &[String]) -> Result<String> {
        self.log(format!("request_certificate {}", domain));
        let mut state = self.state.lock().unwrap();
        let id = format!("arn:aws:acm:us-east-1:123456789012:certificate/{}", state.next_id());
        state.certificates.push(FakeCertificate {
            detail: CertificateDetail {
                id: id.clone(),
                domain: domain.to_string(),
                sans: sans.to_vec(),
                status: CertificateStatus::PendingValidation,
                validations: validations(sans),
            },
            options_delay: self.options_delay,
        });
        Ok(id)
    }

    async fn describe_certificate(&self, id: &str) -> Result<CertificateDetail> {
        let mut state = self.state.lock().unwrap();
        let records = state.records.clone();
        let certificate = state
            .certificates
            .iter_mut()
            .find(|c| c.detail.id == id)
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;

        if certificate.options_delay > 0 {
            certificate.options_delay -= 1;
            let mut detail = certificate.detail.clone();
            for validation in &mut detail.validations {
                validation.record = None;
            }
            return Ok(detail);
        }

        let validated = certificate.detail.validations.iter().all(|v| {
            v.record
                .as_ref()
                .is_some_and(|want| records.iter().any(|r| r.same_key(want) && r.same_content(want)))
        });
        if self.auto_issue && validated && certificate.detail.status == CertificateStatus::PendingValidation {
            certificate.detail.status = CertificateStatus::Issued;
        }
        Ok(certificate.detail.clone())
    }
}

#[async_trait]
impl DnsProvider for FakeCloud {
    fn name(&self) -> &str {
        "fake"
    }

    fn display_name(&self) -> &str {
        "Fake DNS"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn can_manage_domain(&self, _domain: &str) -> Result<bool> {
        Ok(self.manages_domain)
    }

    async fn list_records(&self, _domain: &str) -> Result<Vec<DnsRecord>> {
        Ok(self.records())
    }

    async fn upsert_record(&self, _domain: &str, record: &DnsRecord) -> Result<RecordChange> {
        if self.rejected_names.iter().any(|n| names_equal(n, &record.name)) {
            return Err(CloudError::ApiError(format!(
                "Throttling: rate exceeded for {}",
                record.name
            )));
        }
        if record.record_type == RecordType::Alias && !self.capabilities.alias_records {
            return Err(CloudError::UnsupportedRecord("ALIAS".to_string()));
        }
        if record.record_type == RecordType::Cname
            && is_apex_domain(&record.name)
            && !self.capabilities.apex_cname
        {
            return Err(CloudError::ApiError(format!(
                "RRSet of type CNAME with DNS name {} is not permitted at apex",
                record.name
            )));
        }

        let mut state = self.state.lock().unwrap();
        let change = match state.records.iter_mut().find(|r| r.same_key(record)) {
            Some(existing) if existing.same_content(record) => RecordChange::Unchanged,
            Some(existing) => {
                *existing = record.clone();
                RecordChange::Updated
            }
            None => {
                state.records.push(record.clone());
                RecordChange::Created
            }
        };
        if change != RecordChange::Unchanged {
            state
                .calls
                .push(format!("upsert_record {} {}", record.name, record.record_type));
        }
        Ok(change)
    }

    async fn delete_record(&self, _domain: &str, record: &DnsRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("delete_record {} {}", record.name, record.record_type));
        state.records.retain(|r| !r.same_key(record));
        Ok(())
    }
}

impl StackTemplate for FakeCloud {
    fn render(&self, input: &TemplateInput) -> Result<String> {
        Ok(serde_json::to_string(input)?)
    }
}

#[async_trait]
impl SitePublisher for FakeCloud {
    async fn sync(&self, source: &Path, bucket: &str) -> Result<SyncReport> {
        self.state
            .lock()
            .unwrap()
            .synced
            .push((source.display().to_string(), bucket.to_string()));
        Ok(SyncReport {
            uploaded: 3,
            bytes: 2048,
        })
    }
}

/// Deployment spec for `domain` with a `./dist` source
pub fn spec(domain: &str) -> DeploymentSpec {
    spec_with(domain, "")
}

/// Deployment spec with extra `site` child nodes
pub fn spec_with(domain: &str, extra: &str) -> DeploymentSpec {
    let kdl = format!(
        r#"
site "marketing" {{
    domain "{domain}"
    region "us-east-1"
    source "./dist"
    {extra}
}}
"#
    );
    let site = parse_site_string(&kdl).unwrap();
    DeploymentSpec::try_from(site).unwrap()
}
