//! edgeship cloud collaborators
//!
//! This crate defines the contracts the deployment engine consumes, so that the
//! reconciliation logic never talks to a cloud SDK directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 edgeship CLI                     │
//! │                (edgeship deploy)                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               edgeship-deploy                    │
//! │   adoption · stack · certificate · dns · run     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               edgeship-cloud                     │
//! │  trait StackApi / StorageApi / CdnApi            │
//! │  trait CertificateApi / DnsProvider              │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │      aws      │ │  cloudflare   │
//! │ cfn/s3/cf/acm │ │      dns      │
//! │   route53     │ │               │
//! └───────────────┘ └───────────────┘
//! ```

pub mod cdn;
pub mod certificate;
pub mod dns;
pub mod error;
pub mod poll;
pub mod publish;
pub mod stack;
pub mod storage;
pub mod template;

// Re-exports
pub use cdn::{Aliases, CdnApi, DistributionConfig, DistributionSummary, Origin};
pub use certificate::{
    CertificateApi, CertificateDetail, CertificateStatus, CertificateSummary, DomainValidation,
};
pub use dns::{DnsProvider, DnsRecord, ProviderCapabilities, RecordChange, RecordType};
pub use error::{CloudError, Result};
pub use poll::{Poll, PollOutcome, PollPolicy, poll_until};
pub use publish::{SitePublisher, SyncReport};
pub use stack::{StackApi, StackDescription, StackRequest, StackState};
pub use storage::StorageApi;
pub use template::{StackTemplate, TemplateInput};
