//! site.kdl から読み込んだ未検証の設定

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// site ノードの内容（検証前）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// サイト識別子（site ノードの引数）
    pub name: String,

    /// 公開ドメイン（example.com, app.example.com など）
    pub domain: Option<String>,

    /// リージョン（us-east-1 など）
    pub region: Option<String>,

    /// オリジンバケット名
    pub bucket: Option<String>,

    /// 既存の証明書ID（ARN）
    pub certificate: Option<String>,

    /// スタック名
    pub stack: Option<String>,

    /// アップロード対象ディレクトリ
    pub source: Option<PathBuf>,

    /// インデックスドキュメント
    pub index_document: Option<String>,

    /// エラードキュメント
    pub error_document: Option<String>,

    /// キャッシュ設定
    pub cache: CacheSettings,

    /// CloudFront 価格クラス
    pub price_class: Option<String>,

    /// 証明書に追加する SAN
    pub extra_sans: Vec<String>,

    /// 証明書発行を待つ最大時間（分）
    pub certificate_wait_minutes: Option<u32>,

    /// リソースに付与するタグ
    pub tags: BTreeMap<String, String>,

    /// DNS プロバイダー名（dns ノードの引数）
    pub dns_provider: Option<String>,

    /// DNS プロバイダー固有の設定
    pub dns_settings: BTreeMap<String, String>,
}

impl SiteConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// キャッシュTTL設定（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub min_ttl: u32,
    pub default_ttl: u32,
    pub max_ttl: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            min_ttl: 0,
            default_ttl: 86_400,
            max_ttl: 31_536_000,
        }
    }
}
