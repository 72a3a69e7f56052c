//! 検証済みのデプロイ仕様

use crate::error::{CoreError, Result};
use crate::model::{CacheSettings, DEFAULT_CLOUDFLARE_TOKEN_ENV, DnsProviderConfig, SiteConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

/// 証明書発行待ちの既定時間（分）
pub const DEFAULT_CERTIFICATE_WAIT_MINUTES: u32 = 30;

/// 既定の CloudFront 価格クラス
pub const DEFAULT_PRICE_CLASS: &str = "PriceClass_100";

/// スタックに付けるサイト識別タグ
pub const SITE_TAG: &str = "edgeship:site";

static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").expect("valid regex")
});

static BUCKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("valid regex"));

/// 1回のデプロイ実行で使う不変の仕様
///
/// 設定ファイルから一度だけ生成され、実行中に変更されることはありません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub site: String,
    pub domain: String,
    pub region: String,
    pub bucket_name: String,
    pub certificate_id: Option<String>,
    pub stack_name: String,
    pub source_dir: Option<PathBuf>,
    pub index_document: String,
    pub error_document: Option<String>,
    pub cache: CacheSettings,
    pub price_class: String,
    pub extra_sans: Vec<String>,
    pub certificate_wait_minutes: u32,
    pub tags: BTreeMap<String, String>,
    pub dns: DnsProviderConfig,
}

impl DeploymentSpec {
    /// ドメインが apex（ラベル2つ）かどうか
    pub fn is_apex(&self) -> bool {
        self.domain.split('.').count() == 2
    }

    /// apex の場合の www ドメイン
    pub fn www_domain(&self) -> Option<String> {
        self.is_apex().then(|| format!("www.{}", self.domain))
    }

    /// ディストリビューションに設定する代替ドメイン名
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases = vec![self.domain.clone()];
        aliases.extend(self.www_domain());
        aliases
    }

    /// 証明書に必要な SAN（ドメイン ∪ 追加SAN ∪ apexならwww）
    pub fn required_sans(&self) -> Vec<String> {
        let mut sans = vec![self.domain.clone()];
        for san in self.extra_sans.iter().cloned().chain(self.www_domain()) {
            if !sans.contains(&san) {
                sans.push(san);
            }
        }
        sans
    }

    /// スタックに付けるタグ（サイト識別タグを含む）
    pub fn stack_tags(&self) -> BTreeMap<String, String> {
        let mut tags = self.tags.clone();
        tags.insert(SITE_TAG.to_string(), self.site.clone());
        tags
    }
}

/// ドメイン名から既定のバケット名を生成
pub fn default_bucket_name(domain: &str) -> String {
    let base: String = domain.replace('.', "-");
    // "-site" を付けても 63 文字に収まるよう切り詰める
    let base = &base[..base.len().min(58)];
    format!("{}-site", base.trim_end_matches('-'))
}

fn normalize_domain(raw: &str) -> Result<String> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.contains("://") || domain.contains('/') || !DOMAIN_PATTERN.is_match(&domain) {
        return Err(CoreError::InvalidDomain(raw.to_string()));
    }
    Ok(domain)
}

fn validate_bucket_name(raw: &str) -> Result<String> {
    let bucket = raw.trim().to_ascii_lowercase();
    if !BUCKET_PATTERN.is_match(&bucket) || bucket.contains("..") {
        return Err(CoreError::InvalidBucketName(raw.to_string()));
    }
    Ok(bucket)
}

fn dns_config(site: &SiteConfig) -> Result<DnsProviderConfig> {
    let provider = site.dns_provider.as_deref().unwrap_or("route53");
    let setting = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| site.dns_settings.get(*k))
            .cloned()
    };

    match provider {
        "route53" | "route-53" | "aws" => Ok(DnsProviderConfig::Route53 {
            hosted_zone_id: setting(&["hosted-zone", "hosted_zone", "hosted-zone-id"]),
        }),
        "cloudflare" => Ok(DnsProviderConfig::Cloudflare {
            zone_id: setting(&["zone-id", "zone_id"]),
            api_token_env: setting(&["api-token-env", "api_token_env"])
                .unwrap_or_else(|| DEFAULT_CLOUDFLARE_TOKEN_ENV.to_string()),
        }),
        other => Err(CoreError::UnknownDnsProvider(other.to_string())),
    }
}

impl TryFrom<SiteConfig> for DeploymentSpec {
    type Error = CoreError;

    fn try_from(site: SiteConfig) -> Result<Self> {
        let domain = site.domain.as_deref().ok_or(CoreError::MissingField {
            site: site.name.clone(),
            field: "domain",
        })?;
        let domain = normalize_domain(domain)?;

        let region = site
            .region
            .clone()
            .filter(|r| !r.trim().is_empty())
            .ok_or(CoreError::MissingField {
                site: site.name.clone(),
                field: "region",
            })?;

        let bucket_name = match &site.bucket {
            Some(bucket) => validate_bucket_name(bucket)?,
            None => default_bucket_name(&domain),
        };

        let mut extra_sans = Vec::new();
        for san in &site.extra_sans {
            extra_sans.push(normalize_domain(san)?);
        }

        let dns = dns_config(&site)?;

        if site.cache.min_ttl > site.cache.default_ttl || site.cache.default_ttl > site.cache.max_ttl {
            return Err(CoreError::InvalidConfig(format!(
                "cache TTL は min <= default <= max である必要があります (min={}, default={}, max={})",
                site.cache.min_ttl, site.cache.default_ttl, site.cache.max_ttl
            )));
        }

        let certificate_wait_minutes = site
            .certificate_wait_minutes
            .unwrap_or(DEFAULT_CERTIFICATE_WAIT_MINUTES);
        if certificate_wait_minutes == 0 {
            return Err(CoreError::InvalidConfig(
                "certificate-wait-minutes は 1 以上を指定してください".to_string(),
            ));
        }

        Ok(DeploymentSpec {
            stack_name: site
                .stack
                .clone()
                .unwrap_or_else(|| format!("edgeship-{}", site.name)),
            site: site.name,
            domain,
            region,
            bucket_name,
            certificate_id: site.certificate,
            source_dir: site.source,
            index_document: site
                .index_document
                .unwrap_or_else(|| "index.html".to_string()),
            error_document: site.error_document,
            cache: site.cache,
            price_class: site
                .price_class
                .unwrap_or_else(|| DEFAULT_PRICE_CLASS.to_string()),
            extra_sans,
            certificate_wait_minutes,
            tags: site.tags,
            dns,
        })
    }
}
