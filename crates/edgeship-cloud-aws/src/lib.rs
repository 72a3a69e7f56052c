//! AWS backend for edgeship
//!
//! Implements the collaborator traits of [`edgeship_cloud`] on the AWS SDK:
//!
//! | Trait | Service |
//! |-------|---------|
//! | `StackApi` | CloudFormation |
//! | `StorageApi`, `SitePublisher` | S3 |
//! | `CdnApi` | CloudFront |
//! | `CertificateApi` | ACM (`us-east-1`) |
//! | `DnsProvider` | Route 53 |
//! | `StackTemplate` | CloudFormation JSON |
//!
//! Credentials come from the standard AWS provider chain (env vars, profiles,
//! SSO, instance metadata).
//!
//! # Example
//!
//! ```ignore
//! use edgeship_cloud_aws::AwsCloud;
//!
//! let aws = AwsCloud::from_env("eu-west-1").await;
//! let stacks = aws.stacks();
//! let dns = aws.route53(None);
//! ```

pub mod acm;
pub mod cloudformation;
pub mod cloudfront;
pub mod error;
pub mod route53;
pub mod s3;
pub mod template;

pub use acm::AcmCertificates;
pub use cloudformation::CloudFormationStacks;
pub use cloudfront::CloudFrontCdn;
pub use error::{AwsError, Result};
pub use route53::Route53Dns;
pub use s3::{S3Publisher, S3Storage};
pub use template::CloudFormationTemplate;

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Shared SDK configuration from which every adapter is built
#[derive(Debug, Clone)]
pub struct AwsCloud {
    config: SdkConfig,
}

impl AwsCloud {
    /// Load credentials from the default provider chain for `region`
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        tracing::debug!("Loaded AWS configuration for {}", region);
        Self { config }
    }

    pub fn from_config(config: SdkConfig) -> Self {
        Self { config }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn stacks(&self) -> CloudFormationStacks {
        CloudFormationStacks::new(&self.config)
    }

    pub fn storage(&self) -> S3Storage {
        S3Storage::new(&self.config)
    }

    pub fn cdn(&self) -> CloudFrontCdn {
        CloudFrontCdn::new(&self.config)
    }

    pub fn certificates(&self) -> AcmCertificates {
        AcmCertificates::new(&self.config)
    }

    pub fn publisher(&self) -> S3Publisher {
        S3Publisher::new(&self.config)
    }

    pub fn template(&self) -> CloudFormationTemplate {
        CloudFormationTemplate::new()
    }

    /// Route 53 provider; the hosted zone is looked up by name when `None`
    pub fn route53(&self, hosted_zone_id: Option<String>) -> Route53Dns {
        Route53Dns::new(&self.config, hosted_zone_id)
    }
}
