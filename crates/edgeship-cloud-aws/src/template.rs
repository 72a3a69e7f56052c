//! CloudFormation template for a static site
//!
//! One stack holds the private origin bucket, the origin access control, the
//! bucket policy granting CloudFront read access, and the distribution itself.

use edgeship_cloud::stack::{OUTPUT_BUCKET_NAME, OUTPUT_DISTRIBUTION_DOMAIN, OUTPUT_DISTRIBUTION_ID};
use edgeship_cloud::{StackTemplate, TemplateInput};
use serde_json::{Value, json};

const ORIGIN_ID: &str = "site-bucket";

/// Renders [`TemplateInput`] into a CloudFormation JSON document
#[derive(Debug, Clone, Default)]
pub struct CloudFormationTemplate;

impl CloudFormationTemplate {
    pub fn new() -> Self {
        Self
    }

    /// Template as a JSON value
    pub fn document(&self, input: &TemplateInput) -> Value {
        json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": format!("edgeship static site {}", input.site),
            "Resources": {
                "SiteBucket": {
                    "Type": "AWS::S3::Bucket",
                    "Properties": {
                        "BucketName": input.bucket_name,
                        "PublicAccessBlockConfiguration": {
                            "BlockPublicAcls": true,
                            "BlockPublicPolicy": true,
                            "IgnorePublicAcls": true,
                            "RestrictPublicBuckets": true
                        },
                        "BucketEncryption": {
                            "ServerSideEncryptionConfiguration": [{
                                "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                            }]
                        }
                    }
                },
                "OriginAccessControl": {
                    "Type": "AWS::CloudFront::OriginAccessControl",
                    "Properties": {
                        "OriginAccessControlConfig": {
                            "Name": oac_name(&input.bucket_name),
                            "OriginAccessControlOriginType": "s3",
                            "SigningBehavior": "always",
                            "SigningProtocol": "sigv4"
                        }
                    }
                },
                "SiteBucketPolicy": {
                    "Type": "AWS::S3::BucketPolicy",
                    "Properties": {
                        "Bucket": { "Ref": "SiteBucket" },
                        "PolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Sid": "AllowCloudFrontRead",
                                "Effect": "Allow",
                                "Principal": { "Service": "cloudfront.amazonaws.com" },
                                "Action": "s3:GetObject",
                                "Resource": { "Fn::Sub": "${SiteBucket.Arn}/*" },
                                "Condition": {
                                    "StringEquals": {
                                        "AWS:SourceArn": {
                                            "Fn::Sub": "arn:aws:cloudfront::${AWS::AccountId}:distribution/${Distribution}"
                                        }
                                    }
                                }
                            }]
                        }
                    }
                },
                "Distribution": {
                    "Type": "AWS::CloudFront::Distribution",
                    "Properties": {
                        "DistributionConfig": distribution_config(input)
                    }
                }
            },
            "Outputs": {
                OUTPUT_BUCKET_NAME: { "Value": { "Ref": "SiteBucket" } },
                OUTPUT_DISTRIBUTION_ID: { "Value": { "Ref": "Distribution" } },
                OUTPUT_DISTRIBUTION_DOMAIN: {
                    "Value": { "Fn::GetAtt": ["Distribution", "DomainName"] }
                }
            }
        })
    }
}

impl StackTemplate for CloudFormationTemplate {
    fn render(&self, input: &TemplateInput) -> edgeship_cloud::Result<String> {
        Ok(serde_json::to_string_pretty(&self.document(input))?)
    }
}

fn distribution_config(input: &TemplateInput) -> Value {
    let mut config = json!({
        "Enabled": true,
        "Comment": format!("edgeship {}", input.site),
        "Aliases": input.aliases,
        "DefaultRootObject": input.index_document,
        "HttpVersion": "http2and3",
        "IPV6Enabled": true,
        "PriceClass": input.price_class,
        "Origins": [{
            "Id": ORIGIN_ID,
            "DomainName": { "Fn::GetAtt": ["SiteBucket", "RegionalDomainName"] },
            "S3OriginConfig": { "OriginAccessIdentity": "" },
            "OriginAccessControlId": { "Fn::GetAtt": ["OriginAccessControl", "Id"] }
        }],
        "DefaultCacheBehavior": {
            "TargetOriginId": ORIGIN_ID,
            "ViewerProtocolPolicy": "redirect-to-https",
            "AllowedMethods": ["GET", "HEAD"],
            "CachedMethods": ["GET", "HEAD"],
            "Compress": true,
            "ForwardedValues": { "QueryString": false },
            "MinTTL": input.min_ttl,
            "DefaultTTL": input.default_ttl,
            "MaxTTL": input.max_ttl
        },
        "ViewerCertificate": {
            "AcmCertificateArn": input.certificate_id,
            "SslSupportMethod": "sni-only",
            "MinimumProtocolVersion": "TLSv1.2_2021"
        }
    });

    if let Some(error_document) = &input.error_document {
        let page = format!("/{}", error_document.trim_start_matches('/'));
        // private バケットは存在しないキーに 403 を返す
        config["CustomErrorResponses"] = json!([
            { "ErrorCode": 403, "ResponseCode": 404, "ResponsePagePath": page },
            { "ErrorCode": 404, "ResponseCode": 404, "ResponsePagePath": page }
        ]);
    }

    config
}

/// Origin access control names are limited to 64 characters
fn oac_name(bucket_name: &str) -> String {
    let name = format!("{}-oac", bucket_name);
    if name.len() <= 64 {
        return name;
    }
    name[name.len() - 64..].to_string()
}
