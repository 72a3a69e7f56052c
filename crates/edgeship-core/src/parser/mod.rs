//! KDLパーサー
//!
//! edgeship の site.kdl をパースします。

mod site;

pub use site::parse_site;

use crate::error::{CoreError, Result};
use crate::model::SiteConfig;
use kdl::KdlDocument;
use std::fs;
use std::path::Path;

/// KDLファイルをパースして SiteConfig を生成
pub fn parse_site_file<P: AsRef<Path>>(path: P) -> Result<SiteConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CoreError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut site = parse_site_string(&content)?;

    // source の相対パスは設定ファイルのディレクトリ基準で解決
    if let (Some(source), Some(base)) = (site.source.as_ref(), path.parent())
        && source.is_relative()
    {
        site.source = Some(base.join(source));
    }

    tracing::debug!("Loaded site '{}' from {}", site.name, path.display());
    Ok(site)
}

/// KDL文字列をパース
pub fn parse_site_string(content: &str) -> Result<SiteConfig> {
    let doc: KdlDocument = content.parse()?;

    let mut found: Option<SiteConfig> = None;

    for node in doc.nodes() {
        match node.name().value() {
            "site" => {
                let site = parse_site(node)?;
                if let Some(existing) = &found {
                    return Err(CoreError::DuplicateSite(format!(
                        "{}, {}",
                        existing.name, site.name
                    )));
                }
                found = Some(site);
            }
            other => {
                tracing::warn!("Unknown top-level node ignored: {}", other);
            }
        }
    }

    found.ok_or(CoreError::SiteNotDefined)
}
