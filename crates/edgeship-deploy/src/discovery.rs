//! Resource discovery and adoption
//!
//! Decides whether the target domain is already served by a live distribution
//! (adopt it) or fresh resources must be provisioned, and clears buckets orphaned
//! by earlier failed runs out of the way.

use crate::error::Result;
use edgeship_cloud::{CdnApi, StorageApi};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

const MAX_BUCKET_NAME_LEN: usize = 63;

static S3_ORIGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\.s3[.-]").expect("valid regex"));

/// A distribution and origin bucket already serving the domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptedInfrastructure {
    pub distribution_id: String,
    pub distribution_domain: String,
    pub bucket_name: String,
}

/// Result of the adoption check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Adopted(AdoptedInfrastructure),
    /// Nothing to adopt; provision fresh resources with this bucket name
    NotFound { bucket_name: String },
}

/// Extract the bucket name from an S3 origin host
///
/// Matches `<bucket>.s3.<region>.amazonaws.com`, `<bucket>.s3.amazonaws.com` and
/// `<bucket>.s3-website-<region>.amazonaws.com`.
pub fn bucket_from_origin(host: &str) -> Option<String> {
    S3_ORIGIN
        .captures(&host.to_ascii_lowercase())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Find a distribution aliased to `domain` whose origin is a bucket
pub async fn find_adoptable(cdn: &dyn CdnApi, domain: &str) -> Result<Option<AdoptedInfrastructure>> {
    let distributions = cdn.list_distributions().await?;
    tracing::debug!("Inspecting {} distributions for {}", distributions.len(), domain);

    for distribution in distributions {
        if !distribution.aliases.contains(domain) {
            continue;
        }

        tracing::info!(
            "Distribution {} already serves {}",
            distribution.id,
            domain
        );

        let config = cdn.get_distribution_config(&distribution.id).await?;
        let bucket = config
            .origins
            .iter()
            .find_map(|origin| bucket_from_origin(&origin.domain_name));

        match bucket {
            Some(bucket_name) => {
                return Ok(Some(AdoptedInfrastructure {
                    distribution_id: distribution.id,
                    distribution_domain: distribution.domain_name,
                    bucket_name,
                }));
            }
            None => {
                tracing::warn!(
                    "Distribution {} serves {} but has no bucket origin; not adopting",
                    distribution.id,
                    domain
                );
            }
        }
    }

    Ok(None)
}

/// Adoption check: reuse a serving distribution, or prepare a bucket name for provisioning
pub async fn discover(
    cdn: &dyn CdnApi,
    storage: &dyn StorageApi,
    domain: &str,
    candidate_bucket: &str,
    cleanup_budget: Duration,
) -> Result<Discovery> {
    if let Some(adopted) = find_adoptable(cdn, domain).await? {
        return Ok(Discovery::Adopted(adopted));
    }

    let bucket_name = reclaim_bucket_name(storage, candidate_bucket, cleanup_budget).await?;
    Ok(Discovery::NotFound { bucket_name })
}

/// Make `candidate` available for a fresh stack
///
/// A bucket with that name left behind by a failed run is emptied and deleted. If that
/// does not finish within `budget`, an alternate time-suffixed name is returned instead.
pub async fn reclaim_bucket_name(
    storage: &dyn StorageApi,
    candidate: &str,
    budget: Duration,
) -> Result<String> {
    if !storage.bucket_exists(candidate).await? {
        return Ok(candidate.to_string());
    }

    tracing::info!("Found orphaned bucket {}, removing it", candidate);

    let cleanup = async {
        storage.empty_bucket(candidate).await?;
        storage.delete_bucket(candidate).await
    };

    match tokio::time::timeout(budget, cleanup).await {
        Ok(Ok(())) => {
            tracing::info!("Removed orphaned bucket {}", candidate);
            Ok(candidate.to_string())
        }
        Ok(Err(e)) => {
            tracing::warn!("Could not remove orphaned bucket {}: {}", candidate, e);
            Ok(alternate_bucket_name(candidate, chrono::Utc::now().timestamp_millis()))
        }
        Err(_) => {
            tracing::warn!(
                "Removing orphaned bucket {} exceeded {:?}",
                candidate,
                budget
            );
            Ok(alternate_bucket_name(candidate, chrono::Utc::now().timestamp_millis()))
        }
    }
}

/// `<base>-<suffix>` where the suffix is the low six base-36 digits of `millis`
pub fn alternate_bucket_name(base: &str, millis: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut value = millis.unsigned_abs();
    let mut suffix = [b'0'; 6];
    for slot in suffix.iter_mut().rev() {
        *slot = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    let suffix = String::from_utf8_lossy(&suffix);

    let keep = MAX_BUCKET_NAME_LEN - suffix.len() - 1;
    let base = &base[..base.len().min(keep)];
    format!("{}-{}", base.trim_end_matches(['-', '.']), suffix)
}
