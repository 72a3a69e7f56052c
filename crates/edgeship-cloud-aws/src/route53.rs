//! Route 53 DNS provider
//!
//! Apex domains are served with alias A records pointing at the CloudFront
//! distribution; Route 53 does not allow a CNAME at the zone apex.

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_sdk_route53::Client;
use aws_sdk_route53::types::{
    AliasTarget, Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};
use edgeship_cloud::dns::{names_equal, normalize_name, zone_candidates};
use edgeship_cloud::{DnsProvider, DnsRecord, ProviderCapabilities, RecordChange, RecordType};
use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed hosted zone of every CloudFront distribution, used as alias target zone
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// TTL for records written by edgeship
const DEFAULT_TTL: i64 = 300;

/// Route 53 DNS manager
pub struct Route53Dns {
    client: Client,
    hosted_zone_id: Option<String>,
    /// domain → hosted zone id
    zones: Mutex<HashMap<String, String>>,
}

impl Route53Dns {
    pub fn new(config: &aws_config::SdkConfig, hosted_zone_id: Option<String>) -> Self {
        Self {
            client: Client::new(config),
            hosted_zone_id: hosted_zone_id.map(|id| strip_zone_prefix(&id).to_string()),
            zones: Mutex::new(HashMap::new()),
        }
    }

    /// Hosted zone id serving `domain`
    pub async fn zone_id(&self, domain: &str) -> Result<String> {
        if let Some(zone_id) = &self.hosted_zone_id {
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
            let output = self
                .client
                .list_hosted_zones_by_name()
                .dns_name(format!("{}.", zone_name))
                .max_items(1)
                .send()
                .await
                .map_err(|e| AwsError::api("ListHostedZonesByName", e))?;

            let found = output
                .hosted_zones()
                .iter()
                .filter(|zone| !zone.config().is_some_and(|config| config.private_zone()))
                .find(|zone| names_equal(zone.name(), &zone_name))
                .map(|zone| strip_zone_prefix(zone.id()).to_string());

            if let Some(zone_id) = found {
                tracing::debug!("Hosted zone for {} is {} ({})", domain, zone_name, zone_id);
                if let Ok(mut zones) = self.zones.lock() {
                    zones.insert(domain, zone_id.clone());
                }
                return Ok(zone_id);
            }
        }

        Err(AwsError::ZoneNotFound(domain))
    }

    /// Every record set of the zone, following pagination
    async fn record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecordSet>> {
        let mut sets = Vec::new();
        let mut next_name: Option<String> = None;
        let mut next_type: Option<RrType> = None;

        loop {
            let output = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(zone_id)
                .set_start_record_name(next_name.take())
                .set_start_record_type(next_type.take())
                .send()
                .await
                .map_err(|e| AwsError::api("ListResourceRecordSets", e))?;

            sets.extend(output.resource_record_sets().iter().cloned());

            if !output.is_truncated() {
                break;
            }
            next_name = output.next_record_name().map(str::to_string);
            next_type = output.next_record_type().cloned();
            if next_name.is_none() {
                break;
            }
        }

        Ok(sets)
    }

    /// The record set currently occupying `(name, type)`
    async fn find_set(
        &self,
        zone_id: &str,
        name: &str,
        rr_type: RrType,
    ) -> Result<Option<ResourceRecordSet>> {
        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(name)
            .start_record_type(rr_type.clone())
            .max_items(1)
            .send()
            .await
            .map_err(|e| AwsError::api("ListResourceRecordSets", e))?;

        Ok(output
            .resource_record_sets()
            .iter()
            .find(|set| names_equal(&unescape_name(set.name()), name) && set.r#type() == &rr_type)
            .cloned())
    }

    async fn change(&self, zone_id: &str, action: ChangeAction, set: ResourceRecordSet) -> Result<()> {
        let change = Change::builder()
            .action(action)
            .resource_record_set(set)
            .build()?;
        let batch = ChangeBatch::builder()
            .changes(change)
            .comment("edgeship")
            .build()?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| AwsError::api("ChangeResourceRecordSets", e))?;
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for Route53Dns {
    fn name(&self) -> &str {
        "route53"
    }

    fn display_name(&self) -> &str {
        "Route 53"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            alias_records: true,
            apex_cname: false,
        }
    }

    async fn can_manage_domain(&self, domain: &str) -> edgeship_cloud::Result<bool> {
        match self.zone_id(domain).await {
            Ok(_) => Ok(true),
            Err(AwsError::ZoneNotFound(zone)) => {
                tracing::debug!("No hosted zone for {}", zone);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_records(&self, domain: &str) -> edgeship_cloud::Result<Vec<DnsRecord>> {
        let zone_id = self.zone_id(domain).await?;
        let sets = self.record_sets(&zone_id).await?;
        Ok(sets.iter().flat_map(observed_records).collect())
    }

    async fn upsert_record(&self, domain: &str, record: &DnsRecord) -> edgeship_cloud::Result<RecordChange> {
        let zone_id = self.zone_id(domain).await?;
        let rr_type = rr_type(record.record_type);

        let current = self.find_set(&zone_id, &record.name, rr_type).await?;
        if let Some(current) = &current
            && observed_records(current)
                .iter()
                .any(|r| r.same_key(record) && r.same_content(record))
        {
            return Ok(RecordChange::Unchanged);
        }

        tracing::info!("UPSERT {}", record);
        self.change(&zone_id, ChangeAction::Upsert, desired_set(record)?)
            .await?;

        Ok(if current.is_some() {
            RecordChange::Updated
        } else {
            RecordChange::Created
        })
    }

    async fn delete_record(&self, domain: &str, record: &DnsRecord) -> edgeship_cloud::Result<()> {
        let zone_id = self.zone_id(domain).await?;
        let rr_type = rr_type(record.record_type);

        // DELETE は現在の値と完全一致する必要がある
        let Some(current) = self.find_set(&zone_id, &record.name, rr_type).await? else {
            tracing::debug!("{} already absent", record);
            return Ok(());
        };

        tracing::info!("DELETE {}", record);
        self.change(&zone_id, ChangeAction::Delete, current).await?;
        Ok(())
    }
}

/// Route 53 type holding a record; alias records live in an `A` set
fn rr_type(record_type: RecordType) -> RrType {
    match record_type {
        RecordType::A | RecordType::Alias => RrType::A,
        RecordType::Aaaa => RrType::Aaaa,
        RecordType::Cname => RrType::Cname,
        RecordType::Txt => RrType::Txt,
    }
}

fn desired_set(record: &DnsRecord) -> Result<ResourceRecordSet> {
    let builder = ResourceRecordSet::builder()
        .name(&record.name)
        .r#type(rr_type(record.record_type));

    let set = match record.record_type {
        RecordType::Alias => builder.alias_target(
            AliasTarget::builder()
                .hosted_zone_id(CLOUDFRONT_HOSTED_ZONE_ID)
                .dns_name(&record.content)
                .evaluate_target_health(false)
                .build()?,
        ),
        _ => builder
            .ttl(record.ttl.map(i64::from).unwrap_or(DEFAULT_TTL))
            .resource_records(
                ResourceRecord::builder()
                    .value(record_value(record))
                    .build()?,
            ),
    };

    Ok(set.build()?)
}

/// Value as Route 53 expects it; TXT strings must be quoted
fn record_value(record: &DnsRecord) -> String {
    match record.record_type {
        RecordType::Txt => format!("\"{}\"", record.content.trim_matches('"')),
        _ => record.content.clone(),
    }
}

/// Records carried by a record set, in edgeship's representation
fn observed_records(set: &ResourceRecordSet) -> Vec<DnsRecord> {
    let name = unescape_name(set.name());
    let type_name = set.r#type().as_str();

    if let Some(alias) = set.alias_target() {
        // AAAA の alias は A と同じ宛先なので一件として扱う
        return match type_name {
            "A" => vec![DnsRecord::alias(name, alias.dns_name())],
            _ => Vec::new(),
        };
    }

    let Ok(record_type) = type_name.parse::<RecordType>() else {
        return Vec::new();
    };
    let ttl = set.ttl().and_then(|ttl| u32::try_from(ttl).ok());

    set.resource_records()
        .iter()
        .map(|r| {
            let value = if record_type == RecordType::Txt {
                r.value().trim_matches('"')
            } else {
                r.value()
            };
            let record = DnsRecord::new(name.clone(), record_type, value);
            match ttl {
                Some(ttl) => record.with_ttl(ttl),
                None => record,
            }
        })
        .collect()
}

/// Hosted zone ids are returned as `/hostedzone/Z123`
fn strip_zone_prefix(id: &str) -> &str {
    id.trim_start_matches("/hostedzone/")
}

/// Decode the `\ooo` octal escapes Route 53 uses in names (`\052` is `*`)
fn unescape_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 4 <= bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let code = (bytes[i + 1] - b'0') as u32 * 64
                + (bytes[i + 2] - b'0') as u32 * 8
                + (bytes[i + 3] - b'0') as u32;
            if let Some(c) = char::from_u32(code) {
                out.push(c);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }

    out
}
