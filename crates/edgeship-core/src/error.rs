use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error(
        "site ノードが見つかりません\nヒント: site.kdl に site \"<name>\" {{ domain \"example.com\" ... }} を定義してください"
    )]
    SiteNotDefined,

    #[error("site ノードが複数定義されています: {0}")]
    DuplicateSite(String),

    #[error("site '{site}' に {field} が指定されていません")]
    MissingField { site: String, field: &'static str },

    #[error("無効なドメイン '{0}'\nヒント: スキームやパスを含まない example.com 形式で指定してください")]
    InvalidDomain(String),

    #[error("無効なバケット名 '{0}'\nヒント: 3〜63文字の英小文字・数字・'.'・'-' のみ使用できます")]
    InvalidBucketName(String),

    #[error("未対応の DNS プロバイダー: {0}\n利用可能: route53, cloudflare")]
    UnknownDnsProvider(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
