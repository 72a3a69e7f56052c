pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_ENV_VAR: &str = "EDGESHIP_CONFIG";

const CANDIDATES: [&str; 4] = ["site.local.kdl", ".site.local.kdl", "site.kdl", ".site.kdl"];

/// edgeship のグローバル設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("edgeship");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// CLI で明示されたパスを優先し、なければ探索する
pub fn resolve_site_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(ConfigError::ExplicitPathNotFound(path.display().to_string())),
        None => find_site_file(),
    }
}

/// プロジェクトの site.kdl ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 EDGESHIP_CONFIG (直接パス指定)
/// 2. カレントディレクトリ: site.local.kdl, .site.local.kdl, site.kdl, .site.kdl
/// 3. ./.edgeship/ ディレクトリ内: 同様の順序
/// 4. ~/.config/edgeship/site.kdl (グローバル設定)
pub fn find_site_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    if let Some(path) = first_existing(&current_dir) {
        return Ok(path);
    }

    // 3. ./.edgeship/ ディレクトリで検索
    let site_dir = current_dir.join(".edgeship");
    if site_dir.is_dir()
        && let Some(path) = first_existing(&site_dir)
    {
        return Ok(path);
    }

    // 4. グローバル設定ファイル (~/.config/edgeship/site.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("edgeship").join("site.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::SiteFileNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let result = get_config_dir();
        assert!(result.is_ok());

        let config_dir = result.unwrap();
        assert!(config_dir.ends_with("edgeship"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_site_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("site.kdl"), "// test").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_ENV_VAR, find_site_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("site.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_site_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("site.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("site.local.kdl"), "// local").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_ENV_VAR, find_site_file);
        std::env::set_current_dir(original_dir).unwrap();

        // site.local.kdl が優先される
        assert!(result.unwrap().ends_with("site.local.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_site_file_in_edgeship_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let site_dir = temp_dir.path().join(".edgeship");
        fs::create_dir(&site_dir).unwrap();
        fs::write(site_dir.join("site.kdl"), "// in dir").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_ENV_VAR, find_site_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".edgeship/site.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_site_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        let result = temp_env::with_var(CONFIG_ENV_VAR, Some(&config_path), find_site_file);
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_site_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_ENV_VAR, find_site_file);
        std::env::set_current_dir(original_dir).unwrap();

        // グローバル設定が存在する環境ではそちらが見つかる
        match result {
            Err(ConfigError::SiteFileNotFound) => {}
            Ok(path) => assert!(path.ends_with("edgeship/site.kdl")),
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_resolve_explicit_missing() {
        let result = resolve_site_file(Some(Path::new("/nonexistent/site.kdl")));
        assert!(matches!(result, Err(ConfigError::ExplicitPathNotFound(_))));
    }

    #[test]
    fn test_resolve_explicit_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("other.kdl");
        fs::write(&path, "// other").unwrap();
        assert_eq!(resolve_site_file(Some(&path)).unwrap(), path);
    }
}
