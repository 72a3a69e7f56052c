//! Cloudflare DNS provider for edgeship
//!
//! Implements [`edgeship_cloud::DnsProvider`] over the Cloudflare v4 API so a site
//! served from CloudFront can keep its DNS on Cloudflare.
//!
//! # Requirements
//!
//! - An API token with `Zone:DNS:Edit` (and `Zone:Zone:Read` when the zone id is
//!   looked up by name), read from the env var named in `site.kdl`
//!   (default `CLOUDFLARE_API_TOKEN`)
//!
//! # Example
//!
//! ```ignore
//! use edgeship_cloud_cloudflare::{CloudflareDns, DnsConfig};
//! use edgeship_cloud::{DnsProvider, DnsRecord};
//!
//! let config = DnsConfig::from_env("CLOUDFLARE_API_TOKEN", None)?;
//! let dns = CloudflareDns::new(config);
//!
//! dns.upsert_record("example.com", &DnsRecord::cname("www.example.com", "d1.cloudfront.net"))
//!     .await?;
//! ```
//!
//! Apex records are written as CNAMEs and rely on Cloudflare's CNAME flattening.

pub mod dns;
pub mod error;

pub use dns::{CloudflareDns, DnsConfig};
pub use error::{CloudflareError, Result};
