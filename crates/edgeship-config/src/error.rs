use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: site.local.kdl, .site.local.kdl, site.kdl, .site.kdl\n\
        - ./.edgeship/ ディレクトリ\n\
        - ~/.config/edgeship/site.kdl\n\
        または EDGESHIP_CONFIG 環境変数で直接指定できます"
    )]
    SiteFileNotFound,

    #[error("指定された設定ファイルが存在しません: {0}")]
    ExplicitPathNotFound(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
