//! Hosting provider signatures
//!
//! Classifies where an existing CNAME points by substring match on its target.

use serde::{Deserialize, Serialize};

/// Target suffixes of this deployment's own CDN
const OWN_CDN_SIGNATURES: &[&str] = &["cloudfront.net"];

/// Known third-party static hosting targets
const FOREIGN_SIGNATURES: &[(&str, &str)] = &[
    ("vercel-dns.com", "Vercel"),
    ("vercel.app", "Vercel"),
    ("now.sh", "Vercel"),
    ("netlify.app", "Netlify"),
    ("netlify.com", "Netlify"),
    ("github.io", "GitHub Pages"),
    ("herokuapp.com", "Heroku"),
    ("herokudns.com", "Heroku"),
    ("pages.dev", "Cloudflare Pages"),
    ("onrender.com", "Render"),
    ("fly.dev", "Fly.io"),
    ("web.app", "Firebase Hosting"),
    ("firebaseapp.com", "Firebase Hosting"),
    ("surge.sh", "Surge"),
    ("azurestaticapps.net", "Azure Static Web Apps"),
    ("amplifyapp.com", "AWS Amplify"),
];

/// Where a record currently sends traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum HostingTarget {
    OwnCdn,
    Foreign(String),
    Unrecognized,
}

impl HostingTarget {
    pub fn is_own_cdn(&self) -> bool {
        matches!(self, HostingTarget::OwnCdn)
    }
}

impl std::fmt::Display for HostingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostingTarget::OwnCdn => write!(f, "CloudFront"),
            HostingTarget::Foreign(name) => write!(f, "{}", name),
            HostingTarget::Unrecognized => write!(f, "another host"),
        }
    }
}

/// Classify a CNAME target
pub fn classify_target(target: &str) -> HostingTarget {
    let target = target.trim_end_matches('.').to_ascii_lowercase();

    if OWN_CDN_SIGNATURES.iter().any(|sig| target.contains(sig)) {
        return HostingTarget::OwnCdn;
    }

    FOREIGN_SIGNATURES
        .iter()
        .find(|(sig, _)| target.contains(sig))
        .map(|(_, name)| HostingTarget::Foreign(name.to_string()))
        .unwrap_or(HostingTarget::Unrecognized)
}
