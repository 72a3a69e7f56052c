//! edgeship deployment engine
//!
//! Reconciles the cloud resources serving a static site (bucket, CDN distribution,
//! TLS certificate and DNS records) so that repeated runs converge instead of
//! duplicating anything.
//!
//! The engine never talks to a cloud SDK directly. Every collaborator is a trait
//! from [`edgeship_cloud`], so the whole flow runs against in-memory fakes in tests.
//!
//! ```text
//! Orchestrator
//!   ├─ dns::precheck        foreign-record detection
//!   ├─ discovery            adoption / orphan buckets
//!   ├─ certificate          request → challenges → issued
//!   ├─ stack                create / update / replace
//!   └─ dns::apply           apex alias or CNAME, www
//! ```

pub mod certificate;
pub mod discovery;
pub mod dns;
pub mod error;
pub mod hosting;
pub mod orchestrator;
pub mod result;
pub mod stack;
pub mod timing;

pub use certificate::{CertificateOutcome, CertificateRequest, CertificateState};
pub use discovery::{AdoptedInfrastructure, Discovery};
pub use dns::{ConflictResolver, DnsConflict, FixedAnswer, Precheck};
pub use error::{DeployError, Result};
pub use hosting::HostingTarget;
pub use orchestrator::{ACCOUNT_VERIFICATION_MESSAGE, CloudServices, Orchestrator, SiteStatus};
pub use result::{DeploymentOutcome, ReconciliationResult};
pub use stack::{ExistingStack, StackOutcome, TeardownOutcome};
pub use timing::Timings;
