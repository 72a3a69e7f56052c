//! Cloudflare DNS API client
//!
//! Talks to the v4 REST API with Bearer token authentication and implements
//! [`DnsProvider`] on top of it.

use crate::error::{CloudflareError, Result};
use async_trait::async_trait;
use edgeship_cloud::dns::{names_equal, normalize_name, zone_candidates};
use edgeship_cloud::{DnsProvider, DnsRecord, ProviderCapabilities, RecordChange, RecordType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Records per listing page (API maximum is 5000, 100 keeps responses small)
const PAGE_SIZE: u32 = 100;

/// TTL value meaning "automatic"
const AUTO_TTL: u32 = 1;

/// Configuration for DNS manager
#[derive(Debug, Clone)]
pub struct DnsConfig {
    pub api_token: String,

    /// Zone to manage; looked up by domain name when absent
    pub zone_id: Option<String>,
}

impl DnsConfig {
    /// Read the API token from `token_env`
    pub fn from_env(token_env: &str, zone_id: Option<String>) -> Result<Self> {
        let api_token = std::env::var(token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CloudflareError::MissingEnvVar(token_env.to_string()))?;

        Ok(Self { api_token, zone_id })
    }
}

/// Cloudflare DNS manager
pub struct CloudflareDns {
    client: reqwest::Client,
    api_token: String,
    zone_id: Option<String>,
    /// domain → zone id
    zones: Mutex<HashMap<String, String>>,
}

impl CloudflareDns {
    /// Create a new DNS manager
    pub fn new(config: DnsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: config.api_token,
            zone_id: config.zone_id,
            zones: Mutex::new(HashMap::new()),
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<ApiResponse<T>> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// Zone id serving `domain`
    pub async fn zone_id(&self, domain: &str) -> Result<String> {
        if let Some(zone_id) = &self.zone_id {
            return Ok(zone_id.clone());
        }

        let domain = normalize_name(domain);
        let cached = self
            .zones
            .lock()
            .ok()
            .and_then(|zones| zones.get(&domain).cloned());
        if let Some(id) = cached {
            return Ok(id);
        }

        for zone_name in zone_candidates(&domain) {
            let url = format!("{}/zones?name={}", CLOUDFLARE_API_BASE, zone_name);
            let zones: Vec<ApiZone> = self.get(&url).await?.into_result()?;
            if let Some(zone) = zones.into_iter().find(|z| names_equal(&z.name, &zone_name)) {
                tracing::debug!("Zone for {} is {} ({})", domain, zone_name, zone.id);
                if let Ok(mut zones) = self.zones.lock() {
                    zones.insert(domain, zone.id.clone());
                }
                return Ok(zone.id);
            }
        }

        Err(CloudflareError::ZoneNotFound(domain))
    }

    /// List every record in the zone, following pagination
    pub async fn list_zone_records(&self, zone_id: &str) -> Result<Vec<ApiDnsRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/zones/{}/dns_records?page={}&per_page={}",
                CLOUDFLARE_API_BASE, zone_id, page, PAGE_SIZE
            );
            let response: ApiResponse<Vec<ApiDnsRecord>> = self.get(&url).await?;
            let total_pages = response
                .result_info
                .as_ref()
                .map(|info| info.total_pages)
                .unwrap_or(1);

            records.extend(response.into_result()?);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    /// Find records by full name and type
    pub async fn find_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<ApiDnsRecord>> {
        let url = format!(
            "{}/zones/{}/dns_records?type={}&name={}",
            CLOUDFLARE_API_BASE, zone_id, record_type, name
        );
        self.get(&url).await?.into_result()
    }

    /// Create a new DNS record
    pub async fn create_record(&self, zone_id: &str, body: &RecordBody) -> Result<ApiDnsRecord> {
        let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;

        let api_response: ApiResponse<ApiDnsRecord> = response.json().await?;
        api_response.into_result()
    }

    /// Overwrite an existing DNS record
    pub async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        body: &RecordBody,
    ) -> Result<ApiDnsRecord> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            CLOUDFLARE_API_BASE, zone_id, record_id
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;

        let api_response: ApiResponse<ApiDnsRecord> = response.json().await?;
        api_response.into_result()
    }

    /// Delete a DNS record by id
    pub async fn delete_record_by_id(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            CLOUDFLARE_API_BASE, zone_id, record_id
        );

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let api_response: ApiResponse<DeleteResult> = response.json().await?;
        api_response.into_result().map(|_| ())
    }

    async fn upsert(&self, domain: &str, record: &DnsRecord) -> Result<RecordChange> {
        if record.record_type == RecordType::Alias {
            return Err(CloudflareError::UnsupportedRecord(format!(
                "{} (Cloudflare has no alias records; use a CNAME)",
                record
            )));
        }

        let zone_id = self.zone_id(domain).await?;
        let body = RecordBody::from(record);
        let existing = self
            .find_records(&zone_id, &record.name, record.record_type.as_str())
            .await?;

        match existing.into_iter().next() {
            Some(current) if current.matches(record) => {
                tracing::debug!("DNS record already up to date: {}", record);
                Ok(RecordChange::Unchanged)
            }
            Some(current) => {
                tracing::info!(
                    "Updating DNS record {} from {} to {}",
                    record.name,
                    current.content,
                    record.content
                );
                self.update_record(&zone_id, &current.id, &body).await?;
                Ok(RecordChange::Updated)
            }
            None => {
                tracing::info!("Creating DNS record: {}", record);
                self.create_record(&zone_id, &body).await?;
                Ok(RecordChange::Created)
            }
        }
    }
}

#[async_trait]
impl DnsProvider for CloudflareDns {
    fn name(&self) -> &str {
        "cloudflare"
    }

    fn display_name(&self) -> &str {
        "Cloudflare"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        // apex の CNAME は CNAME flattening で解決される
        ProviderCapabilities {
            alias_records: false,
            apex_cname: true,
        }
    }

    async fn can_manage_domain(&self, domain: &str) -> edgeship_cloud::Result<bool> {
        match self.zone_id(domain).await {
            Ok(_) => Ok(true),
            Err(CloudflareError::ZoneNotFound(zone)) => {
                tracing::warn!("Cloudflare account has no zone {}", zone);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_records(&self, domain: &str) -> edgeship_cloud::Result<Vec<DnsRecord>> {
        let zone_id = self.zone_id(domain).await?;
        let records = self.list_zone_records(&zone_id).await?;
        Ok(records.iter().filter_map(ApiDnsRecord::to_record).collect())
    }

    async fn upsert_record(
        &self,
        domain: &str,
        record: &DnsRecord,
    ) -> edgeship_cloud::Result<RecordChange> {
        Ok(self.upsert(domain, record).await?)
    }

    async fn delete_record(&self, domain: &str, record: &DnsRecord) -> edgeship_cloud::Result<()> {
        let zone_id = self.zone_id(domain).await?;
        let existing = self
            .find_records(&zone_id, &record.name, record.record_type.as_str())
            .await?;

        if existing.is_empty() {
            tracing::debug!("DNS record not found, nothing to delete: {}", record);
        }
        for found in existing {
            tracing::info!("Deleting DNS record: {} {}", found.name, found.r#type);
            self.delete_record_by_id(&zone_id, &found.id).await?;
        }
        Ok(())
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.success {
            let error_msg = self
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; ");
            let error_msg = if error_msg.is_empty() {
                "Unknown error".to_string()
            } else {
                error_msg
            };
            return Err(CloudflareError::ApiError(error_msg));
        }
        self.result
            .ok_or_else(|| CloudflareError::ApiError("response has no result".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ApiZone {
    id: String,
    name: String,
}

/// Record as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

impl ApiDnsRecord {
    /// Convert to the provider-neutral record; types we do not manage are skipped
    fn to_record(&self) -> Option<DnsRecord> {
        let record_type: RecordType = self.r#type.parse().ok()?;
        let record = DnsRecord::new(&self.name, record_type, &self.content);
        Some(if self.ttl == AUTO_TTL {
            record
        } else {
            record.with_ttl(self.ttl)
        })
    }

    fn matches(&self, desired: &DnsRecord) -> bool {
        // プロキシ済みのレコードは proxied: false へ戻すため更新対象にする
        if self.proxied {
            return false;
        }
        match self.to_record() {
            Some(current) => {
                current.same_content(desired) && desired.ttl.is_none_or(|ttl| ttl == self.ttl)
            }
            None => false,
        }
    }
}

/// Create/update request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordBody {
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl From<&DnsRecord> for RecordBody {
    fn from(record: &DnsRecord) -> Self {
        Self {
            r#type: record.record_type.as_str().to_string(),
            name: normalize_name(&record.name),
            content: record.content.clone(),
            ttl: record.ttl.unwrap_or(AUTO_TTL),
            // CloudFront の前段にプロキシを挟むと証明書検証が壊れる
            proxied: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteResult {
    #[allow(dead_code)]
    id: String,
}
