//! DNS プロバイダー設定

use serde::{Deserialize, Serialize};

/// Cloudflare API トークンを読む既定の環境変数
pub const DEFAULT_CLOUDFLARE_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// 使用する DNS バックエンド
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum DnsProviderConfig {
    /// クラウド側のネイティブ DNS（Route 53）
    Route53 {
        /// ホストゾーンID（省略時はドメイン名から検索）
        hosted_zone_id: Option<String>,
    },
    /// Cloudflare DNS
    Cloudflare {
        /// ゾーンID（省略時はドメイン名から検索）
        zone_id: Option<String>,
        /// API トークンを読む環境変数名
        api_token_env: String,
    },
}

impl Default for DnsProviderConfig {
    fn default() -> Self {
        DnsProviderConfig::Route53 {
            hosted_zone_id: None,
        }
    }
}

impl DnsProviderConfig {
    /// プロバイダー名（route53, cloudflare）
    pub fn name(&self) -> &'static str {
        match self {
            DnsProviderConfig::Route53 { .. } => "route53",
            DnsProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}
