//! CloudFront distribution adapter

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use edgeship_cloud::{Aliases, CdnApi, DistributionConfig, DistributionSummary, Origin};
use std::time::{SystemTime, UNIX_EPOCH};

/// [`CdnApi`] over CloudFront
pub struct CloudFrontCdn {
    client: Client,
}

impl CloudFrontCdn {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    fn invalidation_batch(paths: &[String]) -> Result<InvalidationBatch> {
        let paths = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()?;
        Ok(InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(caller_reference())
            .build()?)
    }
}

/// Unique per invalidation; CloudFront rejects a reused reference with different paths
fn caller_reference() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("edgeship-{}", millis)
}

#[async_trait]
impl CdnApi for CloudFrontCdn {
    async fn list_distributions(&self) -> edgeship_cloud::Result<Vec<DistributionSummary>> {
        let mut distributions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_distributions()
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| AwsError::api("ListDistributions", e))?;

            let Some(list) = output.distribution_list() else {
                break;
            };

            for item in list.items() {
                let aliases: Vec<String> = item
                    .aliases()
                    .map(|a| a.items().to_vec())
                    .unwrap_or_default();

                distributions.push(DistributionSummary {
                    id: item.id().to_string(),
                    domain_name: item.domain_name().to_string(),
                    aliases: Aliases::from(aliases),
                });
            }

            if !list.is_truncated() {
                break;
            }
            marker = list.next_marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }

        tracing::debug!("Listed {} distributions", distributions.len());
        Ok(distributions)
    }

    async fn get_distribution_config(&self, id: &str) -> edgeship_cloud::Result<DistributionConfig> {
        let output = self
            .client
            .get_distribution_config()
            .id(id)
            .send()
            .await
            .map_err(|e| AwsError::api("GetDistributionConfig", e))?;

        let config = output
            .distribution_config()
            .ok_or(AwsError::MissingField("DistributionConfig"))?;

        let origins = config
            .origins()
            .map(|o| o.items())
            .unwrap_or_default()
            .iter()
            .map(|origin| Origin {
                id: origin.id().to_string(),
                domain_name: origin.domain_name().to_string(),
            })
            .collect();

        Ok(DistributionConfig { origins })
    }

    async fn create_invalidation(&self, id: &str, paths: &[String]) -> edgeship_cloud::Result<String> {
        tracing::info!("CreateInvalidation {} {:?}", id, paths);
        let output = self
            .client
            .create_invalidation()
            .distribution_id(id)
            .invalidation_batch(Self::invalidation_batch(paths)?)
            .send()
            .await
            .map_err(|e| AwsError::api("CreateInvalidation", e))?;

        let invalidation_id = output
            .invalidation()
            .map(|i| i.id())
            .ok_or(AwsError::MissingField("Invalidation.Id"))?;
        Ok(invalidation_id.to_string())
    }
}
